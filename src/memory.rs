use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    receipts::{
        repo::ReceiptRepo,
        repo_types::{NewReceipt, Receipt, ReceiptFilters},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    receipts: Vec<Receipt>,
    next_user_id: i64,
    next_receipt_id: i64,
}

/// Process-local store with the same contract as the Postgres repositories.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletes a user along with all of their receipts.
    pub async fn remove_user(&self, id: i64) {
        let mut t = self.tables.lock().await;
        t.users.retain(|u| u.id != id);
        t.receipts.retain(|r| r.user_id != id);
    }

    pub async fn receipt_count(&self) -> usize {
        self.tables.lock().await.receipts.len()
    }

    /// Inserts a receipt with a caller-chosen timestamp.
    pub async fn insert_receipt_at(
        &self,
        receipt: NewReceipt,
        created_at: OffsetDateTime,
    ) -> anyhow::Result<Receipt> {
        let mut t = self.tables.lock().await;
        anyhow::ensure!(
            t.users.iter().any(|u| u.id == receipt.user_id),
            "receipt owner {} does not exist",
            receipt.user_id
        );
        t.next_receipt_id += 1;
        let stored = Receipt {
            id: t.next_receipt_id,
            user_id: receipt.user_id,
            items: receipt.items,
            total_cost: receipt.total_cost,
            payment_type: receipt.payment_type,
            payment_amount: receipt.payment_amount,
            created_at,
        };
        t.receipts.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == user.email) {
            return Ok(None);
        }
        t.next_user_id += 1;
        let stored = User {
            id: t.next_user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        };
        t.users.push(stored.clone());
        Ok(Some(stored))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl ReceiptRepo for MemoryStore {
    async fn insert(&self, receipt: NewReceipt) -> anyhow::Result<Receipt> {
        self.insert_receipt_at(receipt, OffsetDateTime::now_utc()).await
    }

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Receipt>> {
        let t = self.tables.lock().await;
        Ok(t.receipts.iter().find(|r| r.id == id).cloned())
    }

    async fn get_owned(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Receipt>> {
        let t = self.tables.lock().await;
        Ok(t
            .receipts
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn count_by_owner(&self, user_id: i64, filters: &ReceiptFilters) -> anyhow::Result<i64> {
        let t = self.tables.lock().await;
        let n = t
            .receipts
            .iter()
            .filter(|r| r.user_id == user_id && filters.matches(r))
            .count();
        Ok(n as i64)
    }

    async fn query_by_owner(
        &self,
        user_id: i64,
        filters: &ReceiptFilters,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Receipt>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Receipt> = t
            .receipts
            .iter()
            .filter(|r| r.user_id == user_id && filters.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}
