use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};

use crate::receipts::repo_types::{NewReceipt, ProductsBlob, Receipt, ReceiptFilters, ReceiptRow};

#[async_trait]
pub trait ReceiptRepo: Send + Sync {
    async fn insert(&self, receipt: NewReceipt) -> anyhow::Result<Receipt>;
    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Receipt>>;
    /// `None` both for a missing id and for a receipt of another user.
    async fn get_owned(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Receipt>>;
    async fn count_by_owner(&self, user_id: i64, filters: &ReceiptFilters) -> anyhow::Result<i64>;
    /// Newest first.
    async fn query_by_owner(
        &self,
        user_id: i64,
        filters: &ReceiptFilters,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Receipt>>;
}

const RECEIPT_COLUMNS: &str = "id, user_id, products, total_cost, \
    payment_type::text AS payment_type, payment_amount, created_at";

#[derive(Clone)]
pub struct PgReceiptRepo {
    db: PgPool,
}

impl PgReceiptRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_owner_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: i64, f: &ReceiptFilters) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(d) = f.date_from {
        qb.push(" AND created_at >= ").push_bind(d);
    }
    if let Some(d) = f.date_to {
        qb.push(" AND created_at <= ").push_bind(d);
    }
    if let Some(m) = f.min_total {
        qb.push(" AND total_cost >= ").push_bind(m);
    }
    if let Some(m) = f.max_total {
        qb.push(" AND total_cost <= ").push_bind(m);
    }
    if let Some(p) = f.payment_type {
        qb.push(" AND payment_type = ")
            .push_bind(p.as_str())
            .push("::payment_types");
    }
}

#[async_trait]
impl ReceiptRepo for PgReceiptRepo {
    async fn insert(&self, receipt: NewReceipt) -> anyhow::Result<Receipt> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            r#"
            INSERT INTO receipts (user_id, products, total_cost, payment_type, payment_amount)
            VALUES ($1, $2, $3, $4::payment_types, $5)
            RETURNING {RECEIPT_COLUMNS}
            "#
        ))
        .bind(receipt.user_id)
        .bind(Json(ProductsBlob {
            items: receipt.items,
        }))
        .bind(receipt.total_cost)
        .bind(receipt.payment_type.as_str())
        .bind(receipt.payment_amount)
        .fetch_one(&self.db)
        .await
        .context("insert receipt")?;
        row.try_into()
    }

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Receipt>> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get receipt")?;
        row.map(Receipt::try_from).transpose()
    }

    async fn get_owned(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Receipt>> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get owned receipt")?;
        row.map(Receipt::try_from).transpose()
    }

    async fn count_by_owner(&self, user_id: i64, filters: &ReceiptFilters) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM receipts");
        push_owner_filters(&mut qb, user_id, filters);
        let (count,) = qb
            .build_query_as::<(i64,)>()
            .fetch_one(&self.db)
            .await
            .context("count receipts")?;
        Ok(count)
    }

    async fn query_by_owner(
        &self,
        user_id: i64,
        filters: &ReceiptFilters,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Receipt>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {RECEIPT_COLUMNS} FROM receipts"));
        push_owner_filters(&mut qb, user_id, filters);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb
            .build_query_as::<ReceiptRow>()
            .fetch_all(&self.db)
            .await
            .context("list receipts")?;
        rows.into_iter().map(Receipt::try_from).collect()
    }
}
