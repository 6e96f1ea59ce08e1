//! Value Objects for checkout

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One read of the local clock. Every identifier and date produced for a
/// single checkout step is derived from the same `Stamp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(NaiveDateTime);

impl Stamp {
    pub fn new(at: NaiveDateTime) -> Self { Self(at) }
    pub fn at(&self) -> NaiveDateTime { self.0 }

    /// `yyyyMMddHHmmss`
    pub fn compact(&self) -> String { self.0.format(COMPACT_FORMAT).to_string() }

    /// `yyyy-MM-ddTHH:mm:ss`
    pub fn iso(&self) -> String { self.0.format(ISO_FORMAT).to_string() }

    pub fn parse_iso(value: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(value, ISO_FORMAT).ok().map(Self)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.iso()) }
}

/// Order identifier. The client mints a provisional `OD…` token; the
/// server's echoed value replaces it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub const PREFIX: &'static str = "OD";

    pub fn provisional(stamp: &Stamp) -> Self { Self(format!("{}{}", Self::PREFIX, stamp.compact())) }
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Payment attempt identifier, one per attempt.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub const PREFIX: &'static str = "PM";

    pub fn provisional(stamp: &Stamp) -> Self { Self(format!("{}{}", Self::PREFIX, stamp.compact())) }
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }

    /// Time component of a provisional id, if it still carries one.
    pub fn stamp_part(&self) -> Option<&str> {
        self.0.strip_prefix(Self::PREFIX).and_then(|rest| rest.get(..14))
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Whole-won amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn new(amount: i64) -> Self { Self(amount) }
    pub fn amount(&self) -> i64 { self.0 }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0.saturating_add(rhs.0)) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, |acc, m| acc + m) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
