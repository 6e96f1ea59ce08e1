//! Ports onto the page that hosts the checkout flow.

use chrono::{Local, Timelike};

use super::form::FormField;
use crate::domain::value_objects::Stamp;

/// Size and position of the host window, used to center popups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowGeometry {
    pub screen_left: i32,
    pub screen_top: i32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl Default for WindowGeometry {
    fn default() -> Self { Self { screen_left: 0, screen_top: 0, inner_width: 1280, inner_height: 800 } }
}

impl WindowGeometry {
    /// Top-left corner that centers a `width` x `height` window over this one.
    pub fn centered(&self, width: u32, height: u32) -> (i32, i32) {
        let offset = |outer: u32, inner: u32| (i64::from(outer) - i64::from(inner)) / 2;
        let left = i64::from(self.screen_left) + offset(self.inner_width, width);
        let top = i64::from(self.screen_top) + offset(self.inner_height, height);
        (left.clamp(i32::MIN.into(), i32::MAX.into()) as i32, top.clamp(i32::MIN.into(), i32::MAX.into()) as i32)
    }
}

pub trait PageHost: Send + Sync {
    /// Blocking user-facing notice.
    fn alert(&self, message: &str);

    fn focus(&self, field: FormField);

    fn navigate(&self, url: &str);

    fn geometry(&self) -> WindowGeometry { WindowGeometry::default() }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Stamp;
}

/// Local wall clock at whole-second resolution.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Stamp {
        let now = Local::now().naive_local();
        Stamp::new(now.with_nanosecond(0).unwrap_or(now))
    }
}
