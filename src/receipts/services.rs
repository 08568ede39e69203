use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    receipts::{
        dto::{max_amount, PaymentInfo, ProductItem},
        repo::ReceiptRepo,
        repo_types::{LineItem, NewReceipt, Receipt, ReceiptFilters},
    },
};

/// Currency amounts are kept at exactly two decimal places.
pub(crate) fn to_money(value: Decimal) -> Decimal {
    let mut v = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    v.rescale(2);
    v
}

/// Prices every product. Line totals stay exact and the grand total is rounded once.
pub fn price_lines(products: &[ProductItem]) -> AppResult<(Vec<LineItem>, Decimal)> {
    let too_large = || AppError::Validation("receipt total is too large".into());

    let mut items = Vec::with_capacity(products.len());
    let mut exact_total = Decimal::ZERO;
    for p in products {
        let total = p.price.checked_mul(p.quantity).ok_or_else(too_large)?;
        exact_total = exact_total.checked_add(total).ok_or_else(too_large)?;
        items.push(LineItem {
            name: p.name.clone(),
            price: p.price,
            quantity: p.quantity,
            total,
        });
    }

    let total_cost = to_money(exact_total);
    if total_cost > max_amount() {
        return Err(too_large());
    }
    Ok((items, total_cost))
}

/// Nothing is written when the payment does not cover the total.
pub async fn create(
    receipts: &dyn ReceiptRepo,
    user_id: i64,
    products: &[ProductItem],
    payment: PaymentInfo,
) -> AppResult<Receipt> {
    let (items, total_cost) = price_lines(products)?;

    // compared before rounding so 9.995 never covers 10.00
    if payment.amount < total_cost {
        warn!(user_id, %total_cost, payment_amount = %payment.amount, "insufficient payment");
        return Err(AppError::InsufficientPayment);
    }
    let payment_amount = to_money(payment.amount);

    let receipt = receipts
        .insert(NewReceipt {
            user_id,
            items,
            total_cost,
            payment_type: payment.kind,
            payment_amount,
        })
        .await?;

    info!(user_id, receipt_id = receipt.id, %total_cost, "receipt created");
    Ok(receipt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub offset: i64,
}

/// Pages past the end fall back to the last page, and never below page 1.
pub fn page_window(page: i64, per_page: i64, total_count: i64) -> PageWindow {
    let total_pages = (total_count + per_page - 1) / per_page;
    let page = page.min(total_pages).max(1);
    PageWindow {
        page,
        offset: (page - 1) * per_page,
    }
}

#[derive(Debug)]
pub struct ReceiptPage {
    pub items: Vec<Receipt>,
    pub total_count: i64,
    pub page: i64,
    pub per_page: i64,
}

pub async fn list(
    receipts: &dyn ReceiptRepo,
    user_id: i64,
    page: i64,
    per_page: i64,
    filters: &ReceiptFilters,
) -> AppResult<ReceiptPage> {
    let total_count = receipts.count_by_owner(user_id, filters).await?;
    let window = page_window(page, per_page, total_count);
    let items = receipts
        .query_by_owner(user_id, filters, window.offset, per_page)
        .await?;

    Ok(ReceiptPage {
        items,
        total_count,
        page: window.page,
        per_page,
    })
}

pub async fn get_owned(receipts: &dyn ReceiptRepo, user_id: i64, id: i64) -> AppResult<Receipt> {
    receipts
        .get_owned(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt not found".into()))
}

pub async fn get_public(receipts: &dyn ReceiptRepo, id: i64) -> AppResult<Receipt> {
    receipts
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{
            repo::UserRepo,
            repo_types::{NewUser, User},
        },
        memory::MemoryStore,
        receipts::repo_types::PaymentType,
    };
    use time::{Duration, OffsetDateTime};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(name: &str, price: &str, quantity: &str) -> ProductItem {
        ProductItem {
            name: name.into(),
            price: d(price),
            quantity: d(quantity),
        }
    }

    fn pay(kind: PaymentType, amount: &str) -> PaymentInfo {
        PaymentInfo {
            kind,
            amount: d(amount),
        }
    }

    async fn owner(store: &MemoryStore, email: &str) -> User {
        UserRepo::insert(
            store,
            NewUser {
                name: "Owner".into(),
                email: email.into(),
                password_hash: "x".into(),
            },
        )
        .await
        .unwrap()
        .unwrap()
    }

    #[test]
    fn money_is_two_decimals() {
        assert_eq!(to_money(d("21")).to_string(), "21.00");
        assert_eq!(to_money(d("0.125")).to_string(), "0.13");
        assert_eq!(to_money(d("10.004")).to_string(), "10.00");
    }

    #[test]
    fn line_totals_are_exact() {
        let (items, total) = price_lines(&[
            product("A", "10.50", "2"),
            product("B", "5.00", "1"),
            product("Cheese", "0.10", "3"),
            product("Apples", "3.99", "1.25"),
        ])
        .unwrap();
        let totals: Vec<String> = items.iter().map(|i| i.total.to_string()).collect();
        assert_eq!(totals, ["21.00", "5.00", "0.30", "4.9875"]);
        assert_eq!(total.to_string(), "31.29");
    }

    #[test]
    fn grand_total_is_rounded_once() {
        let thirds = [
            product("A", "0.333", "1"),
            product("B", "0.333", "1"),
            product("C", "0.333", "1"),
        ];
        let (items, total) = price_lines(&thirds).unwrap();
        assert_eq!(total.to_string(), "1.00");
        assert_eq!(to_money(items.iter().map(|i| i.total).sum()), total);
    }

    #[test]
    fn oversized_amounts_are_rejected_without_panicking() {
        let huge = product("Huge", "100000000000000000000", "100000000000000000000");
        assert!(matches!(price_lines(&[huge]), Err(AppError::Validation(_))));

        let many = vec![product("Max", "79228162514264337593543950335", "1"); 2];
        assert!(matches!(price_lines(&many), Err(AppError::Validation(_))));

        let over_column = [product("A", "6000000000", "1"), product("B", "4000000000", "1")];
        assert!(matches!(price_lines(&over_column), Err(AppError::Validation(_))));

        let at_limit = [product("A", "9999999999.99", "1")];
        assert_eq!(price_lines(&at_limit).unwrap().1, max_amount());
    }

    #[test]
    fn page_window_clamps() {
        assert_eq!(page_window(1, 10, 0), PageWindow { page: 1, offset: 0 });
        assert_eq!(page_window(2, 5, 15), PageWindow { page: 2, offset: 5 });
        assert_eq!(page_window(9, 5, 15), PageWindow { page: 3, offset: 10 });
        assert_eq!(page_window(4, 5, 16), PageWindow { page: 4, offset: 15 });
        assert_eq!(page_window(5, 100, 1), PageWindow { page: 1, offset: 0 });
    }

    #[tokio::test]
    async fn create_returns_totals_and_rest() {
        let store = MemoryStore::new();
        let u = owner(&store, "a@x.com").await;
        let r = create(
            &store,
            u.id,
            &[product("Test Product 1", "10.50", "2"), product("Test Product 2", "5.00", "1")],
            pay(PaymentType::Cash, "30.00"),
        )
        .await
        .unwrap();
        assert_eq!(r.total_cost.to_string(), "26.00");
        assert_eq!(r.rest().to_string(), "4.00");
        assert_eq!(r.user_id, u.id);
        assert_eq!(r.items.len(), 2);
    }

    #[tokio::test]
    async fn exact_payment_is_enough() {
        let store = MemoryStore::new();
        let u = owner(&store, "a@x.com").await;
        let r = create(&store, u.id, &[product("X", "20", "1")], pay(PaymentType::Card, "20"))
            .await
            .unwrap();
        assert_eq!(r.rest().to_string(), "0.00");
    }

    #[tokio::test]
    async fn insufficient_payment_persists_nothing() {
        let store = MemoryStore::new();
        let u = owner(&store, "a@x.com").await;
        let err = create(
            &store,
            u.id,
            &[product("Expensive Item", "100.00", "1")],
            pay(PaymentType::Card, "50.00"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InsufficientPayment));
        assert_eq!(store.receipt_count().await, 0);
    }

    #[tokio::test]
    async fn payment_short_by_a_fraction_of_a_cent_is_insufficient() {
        let store = MemoryStore::new();
        let u = owner(&store, "a@x.com").await;
        let err = create(&store, u.id, &[product("X", "10.00", "1")], pay(PaymentType::Cash, "9.995"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientPayment));
        assert_eq!(store.receipt_count().await, 0);

        let r = create(&store, u.id, &[product("X", "10.00", "1")], pay(PaymentType::Cash, "10.004"))
            .await
            .unwrap();
        assert_eq!(r.payment_amount.to_string(), "10.00");
        assert_eq!(r.rest().to_string(), "0.00");
    }

    #[tokio::test]
    async fn listing_is_scoped_sorted_and_paged() {
        let store = MemoryStore::new();
        let a = owner(&store, "a@x.com").await;
        let b = owner(&store, "b@x.com").await;
        let base = OffsetDateTime::now_utc();
        for i in 0..15 {
            let (items, total_cost) =
                price_lines(&[product(&format!("P{i}"), "10.00", "1")]).unwrap();
            store
                .insert_receipt_at(
                    NewReceipt {
                        user_id: a.id,
                        items,
                        total_cost,
                        payment_type: PaymentType::Cash,
                        payment_amount: d("15.00"),
                    },
                    base + Duration::minutes(i),
                )
                .await
                .unwrap();
        }
        create(&store, b.id, &[product("Other", "1", "1")], pay(PaymentType::Cash, "1"))
            .await
            .unwrap();

        let page = list(&store, a.id, 2, 5, &ReceiptFilters::default()).await.unwrap();
        assert_eq!(page.total_count, 15);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.page, 2);
        assert!(page.items.iter().all(|r| r.user_id == a.id));
        assert!(page
            .items
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));

        let beyond = list(&store, a.id, 10, 5, &ReceiptFilters::default()).await.unwrap();
        let last = list(&store, a.id, 3, 5, &ReceiptFilters::default()).await.unwrap();
        assert_eq!(beyond.page, 3);
        let ids = |p: &ReceiptPage| p.items.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(&beyond), ids(&last));
    }

    #[tokio::test]
    async fn filters_narrow_the_count() {
        let store = MemoryStore::new();
        let u = owner(&store, "a@x.com").await;
        create(&store, u.id, &[product("A", "10", "1")], pay(PaymentType::Cash, "15")).await.unwrap();
        create(&store, u.id, &[product("B", "50", "1")], pay(PaymentType::Card, "50")).await.unwrap();

        let by_type = ReceiptFilters {
            payment_type: Some(PaymentType::Cash),
            ..Default::default()
        };
        let page = list(&store, u.id, 1, 10, &by_type).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].payment_type, PaymentType::Cash);

        let by_amount = ReceiptFilters {
            min_total: Some(d("30")),
            ..Default::default()
        };
        let page = list(&store, u.id, 1, 10, &by_amount).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert!(page.items[0].total_cost >= d("30"));
    }

    #[tokio::test]
    async fn foreign_and_missing_receipts_look_the_same() {
        let store = MemoryStore::new();
        let a = owner(&store, "a@x.com").await;
        let b = owner(&store, "b@x.com").await;
        let r = create(&store, a.id, &[product("A", "1", "1")], pay(PaymentType::Cash, "1"))
            .await
            .unwrap();

        assert_eq!(get_owned(&store, a.id, r.id).await.unwrap().id, r.id);
        let foreign = get_owned(&store, b.id, r.id).await.unwrap_err();
        let missing = get_owned(&store, b.id, 999).await.unwrap_err();
        assert!(matches!(foreign, AppError::NotFound(_)));
        assert_eq!(foreign.to_string(), missing.to_string());

        assert_eq!(get_public(&store, r.id).await.unwrap().id, r.id);
        assert!(matches!(get_public(&store, 999).await, Err(AppError::NotFound(_))));
    }
}
