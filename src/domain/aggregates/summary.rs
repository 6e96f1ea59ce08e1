//! Order summary snapshot derived from the rendered order form

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Money;

/// Raw cell text of one rendered line-item row, exactly as displayed.
#[derive(Clone, Debug, Default)]
pub struct LineItemRow {
    pub title: Option<String>,
    pub author: Option<String>,
    pub quantity_text: Option<String>,
    pub price_text: Option<String>,
    pub image: Option<String>,
    pub isbn: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub product_name: String,
    pub author: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    #[serde(rename = "img")]
    pub image: String,
    pub isbn: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_number: String,
    pub orderer_name: String,
    pub product_list: Vec<ProductLine>,
    pub total_product_price: Money,
    pub shipping_fee: Money,
    pub final_amount: Money,
}

impl OrderSummary {
    pub fn item_name(&self) -> String {
        self.product_list.first().map(|p| p.product_name.clone()).unwrap_or_else(|| "Order items".to_string())
    }
}

/// Flat shipping fee below a free-shipping threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_threshold: Money,
    pub flat_fee: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self { Self { free_threshold: Money::new(20000), flat_fee: Money::new(3000) } }
}

impl ShippingPolicy {
    pub fn fee_for(&self, total_product_price: Money) -> Money {
        if total_product_price >= self.free_threshold { Money::ZERO } else { self.flat_fee }
    }
}

/// Strips every non-digit character and parses what remains; anything
/// unparseable (including the empty string) is zero.
pub fn parse_digits(text: &str) -> i64 {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

pub struct OrderSummaryBuilder {
    policy: ShippingPolicy,
}

impl OrderSummaryBuilder {
    pub fn new(policy: ShippingPolicy) -> Self { Self { policy } }

    pub fn product_lines(rows: &[LineItemRow]) -> Vec<ProductLine> {
        rows.iter().map(ProductLine::from_row).collect()
    }

    pub fn build(&self, order_number: &str, orderer_name: &str, rows: &[LineItemRow]) -> OrderSummary {
        let product_list = Self::product_lines(rows);
        let total_product_price: Money = product_list.iter().map(|p| p.total_price).sum();
        let shipping_fee = self.policy.fee_for(total_product_price);
        OrderSummary {
            order_number: order_number.to_string(),
            orderer_name: orderer_name.to_string(),
            product_list,
            total_product_price,
            shipping_fee,
            final_amount: total_product_price + shipping_fee,
        }
    }
}

impl ProductLine {
    fn from_row(row: &LineItemRow) -> Self {
        let text = |cell: &Option<String>| cell.as_deref().map(str::trim).unwrap_or_default().to_string();
        let quantity = u32::try_from(parse_digits(row.quantity_text.as_deref().unwrap_or_default())).unwrap_or(0);
        let total_price = Money::new(parse_digits(row.price_text.as_deref().unwrap_or_default()));
        let unit_price = if quantity == 0 { Money::ZERO } else { Money::new(total_price.amount() / i64::from(quantity)) };
        Self {
            product_name: text(&row.title),
            author: text(&row.author),
            quantity,
            unit_price,
            total_price,
            image: text(&row.image),
            isbn: text(&row.isbn),
        }
    }
}
