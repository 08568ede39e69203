use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use sqlx::{types::Json, FromRow};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Card,
}

impl PaymentType {
    /// Value stored in the `payment_types` column.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Card => "card",
        }
    }

    /// Label printed on the text receipt.
    pub fn display_label(self) -> &'static str {
        match self {
            PaymentType::Cash => "Готівка",
            PaymentType::Card => "Карта",
        }
    }
}

impl FromStr for PaymentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentType::Cash),
            "card" => Ok(PaymentType::Card),
            other => anyhow::bail!("unknown payment type {other:?}"),
        }
    }
}

/// One priced product line; `total` is the exact `price * quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<LineItem>,
    pub total_cost: Decimal,
    pub payment_type: PaymentType,
    pub payment_amount: Decimal,
    pub created_at: OffsetDateTime,
}

impl Receipt {
    /// Change due to the customer.
    pub fn rest(&self) -> Decimal {
        self.payment_amount - self.total_cost
    }
}

#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub user_id: i64,
    pub items: Vec<LineItem>,
    pub total_cost: Decimal,
    pub payment_type: PaymentType,
    pub payment_amount: Decimal,
}

/// Optional search criteria; every present field must hold.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiptFilters {
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub date_from: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub date_to: Option<OffsetDateTime>,
    #[serde(default)]
    pub min_total: Option<Decimal>,
    #[serde(default)]
    pub max_total: Option<Decimal>,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
}

impl ReceiptFilters {
    pub fn matches(&self, r: &Receipt) -> bool {
        self.date_from.map_or(true, |d| r.created_at >= d)
            && self.date_to.map_or(true, |d| r.created_at <= d)
            && self.min_total.map_or(true, |m| r.total_cost >= m)
            && self.max_total.map_or(true, |m| r.total_cost <= m)
            && self.payment_type.map_or(true, |p| r.payment_type == p)
    }
}

const NAIVE_DATETIMES: [&[FormatItem<'static>]; 3] = [
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];
const PLAIN_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses RFC 3339, or an ISO-8601 datetime or date without offset taken as UTC.
pub fn parse_instant(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(t);
    }
    // "2024-03-01 10:30" uses a space instead of T
    let naive = match s.split_once(' ') {
        Some((date, time)) => format!("{date}T{time}"),
        None => s.to_string(),
    };
    NAIVE_DATETIMES
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(&naive, *fmt).ok())
        .map(PrimitiveDateTime::assume_utc)
        .or_else(|| Date::parse(s, PLAIN_DATE).ok().map(|d| d.midnight().assume_utc()))
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_instant(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime {raw:?}"))))
        .transpose()
}

/// Shape of the `products` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsBlob {
    pub items: Vec<LineItem>,
}

#[derive(Debug, FromRow)]
pub struct ReceiptRow {
    pub id: i64,
    pub user_id: i64,
    pub products: Json<ProductsBlob>,
    pub total_cost: Decimal,
    pub payment_type: String,
    pub payment_amount: Decimal,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ReceiptRow> for Receipt {
    type Error = anyhow::Error;

    fn try_from(r: ReceiptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            items: r.products.0.items,
            total_cost: r.total_cost,
            payment_type: r.payment_type.parse()?,
            payment_amount: r.payment_amount,
            created_at: r.created_at,
        })
    }
}
