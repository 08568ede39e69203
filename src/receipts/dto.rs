use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    error::{AppError, AppResult},
    receipts::repo_types::{LineItem, PaymentType, Receipt, ReceiptFilters},
};

pub const MIN_LINE_WIDTH: usize = 20;
pub const MAX_LINE_WIDTH: usize = 80;
pub const MAX_PER_PAGE: i64 = 100;

/// Largest value a `NUMERIC(12,2)` money column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(rename = "type")]
    pub kind: PaymentType,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateReceiptRequest {
    pub products: Vec<ProductItem>,
    pub payment: PaymentInfo,
}

impl CreateReceiptRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.products.is_empty() {
            return Err(AppError::Validation("products must not be empty".into()));
        }
        for (i, p) in self.products.iter().enumerate() {
            check_amount(&format!("products[{i}].price"), p.price)?;
            check_amount(&format!("products[{i}].quantity"), p.quantity)?;
        }
        check_amount("payment.amount", self.payment.amount)
    }
}

fn check_amount(field: &str, value: Decimal) -> AppResult<()> {
    if value <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{field} must be > 0")));
    }
    if value > max_amount() {
        return Err(AppError::Validation(format!("{field} must be <= {}", max_amount())));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub id: i64,
    pub products: Vec<LineItem>,
    pub payment: PaymentInfo,
    pub total: Decimal,
    pub rest: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Receipt> for ReceiptResponse {
    fn from(r: Receipt) -> Self {
        let rest = r.rest();
        Self {
            id: r.id,
            payment: PaymentInfo {
                kind: r.payment_type,
                amount: r.payment_amount,
            },
            total: r.total_cost,
            rest,
            created_at: r.created_at,
            products: r.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptListItem {
    pub id: i64,
    pub total: Decimal,
    pub payment_type: PaymentType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Receipt> for ReceiptListItem {
    fn from(r: Receipt) -> Self {
        Self {
            id: r.id,
            total: r.total_cost,
            payment_type: r.payment_type,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptListResponse {
    pub receipts: Vec<ReceiptListItem>,
    pub total_count: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}
fn default_page() -> i64 { 1 }
fn default_per_page() -> i64 { 10 }

impl SearchQuery {
    pub fn validate(&self) -> AppResult<()> {
        if self.page < 1 {
            return Err(AppError::Validation("page must be >= 1".into()));
        }
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(AppError::Validation(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok(())
    }
}

/// Empty body means no filters.
pub fn parse_filters(body: &[u8]) -> AppResult<ReceiptFilters> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReceiptFilters::default());
    }
    let filters: Option<ReceiptFilters> = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("invalid filters: {e}")))?;
    let filters = filters.unwrap_or_default();
    for (field, value) in [("min_total", filters.min_total), ("max_total", filters.max_total)] {
        if value.is_some_and(|v| v < Decimal::ZERO) {
            return Err(AppError::Validation(format!("{field} must be >= 0")));
        }
    }
    Ok(filters)
}

#[derive(Debug, Deserialize)]
pub struct PublicQuery {
    #[serde(default = "default_line_width")]
    pub line_width: usize,
}
fn default_line_width() -> usize { 32 }

impl PublicQuery {
    pub fn validate(&self) -> AppResult<()> {
        if !(MIN_LINE_WIDTH..=MAX_LINE_WIDTH).contains(&self.line_width) {
            return Err(AppError::Validation(format!(
                "line_width must be between {MIN_LINE_WIDTH} and {MAX_LINE_WIDTH}"
            )));
        }
        Ok(())
    }
}
