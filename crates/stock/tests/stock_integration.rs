//! Integration tests for the stock services.
//!
//! These run the services against the in-memory store and check the
//! ledger/product invariants end to end.

use std::sync::Arc;

use common::{ErrorKind, Money, OperationType, ProductId, UserId, UserRole};
use ledger_store::{
    FailPoint, InMemoryStore, LedgerQuery, LedgerStoreExt, NotificationStore, NotificationType,
    Pagination, ProductStore, User, UserStore,
};
use stock::{
    CatalogService, LedgerService, NewProduct, NotificationService, StockChange, StockConfig,
    StockService,
};

struct Harness {
    store: InMemoryStore,
    stock: StockService<InMemoryStore>,
    ledger: LedgerService<InMemoryStore>,
    catalog: CatalogService<InMemoryStore>,
    user_id: UserId,
}

async fn harness() -> Harness {
    harness_with(StockConfig::default()).await
}

async fn harness_with(config: StockConfig) -> Harness {
    let store = InMemoryStore::new();
    let user = User::new("clerk", UserRole::Staff);
    let user_id = user.id;
    store.insert_user(user).await.unwrap();

    Harness {
        stock: StockService::with_config(store.clone(), config.clone()),
        ledger: LedgerService::with_config(store.clone(), config.clone()),
        catalog: CatalogService::with_config(store.clone(), config),
        store,
        user_id,
    }
}

async fn create_product(h: &Harness, sku: &str, quantity: i64, reorder_level: i64) -> ProductId {
    h.catalog
        .create_product(
            NewProduct {
                sku: sku.to_string(),
                name: format!("Item {sku}"),
                category: "general".to_string(),
                unit_price: Money::from_cents(200),
                quantity,
                reorder_level,
                location: None,
                supplier: None,
            },
            h.user_id,
        )
        .await
        .unwrap()
        .id
}

mod mutation {
    use super::*;

    #[tokio::test]
    async fn sale_records_entry_and_raises_low_stock() {
        let h = harness().await;
        let product_id = create_product(&h, "P-1", 20, 10).await;

        let outcome = h
            .stock
            .apply_stock_change(StockChange::set(
                product_id,
                5,
                h.user_id,
                "sale",
                OperationType::Sale,
            ))
            .await
            .unwrap();

        assert_eq!(outcome.entry.old_quantity, 20);
        assert_eq!(outcome.entry.new_quantity, 5);
        assert_eq!(outcome.entry.delta(), -15);
        assert_eq!(outcome.product.quantity, 5);

        let stored = h.store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 5);

        let notifications = h.store.list_notifications(true, 10).await.unwrap();
        assert!(
            notifications
                .iter()
                .any(|n| n.product_id == product_id && n.kind == NotificationType::LowStock)
        );
    }

    #[tokio::test]
    async fn adjust_applies_relative_change() {
        let h = harness().await;
        let product_id = create_product(&h, "P-2", 10, 2).await;

        let outcome = h
            .stock
            .apply_stock_change(StockChange::adjust(
                product_id,
                15,
                h.user_id,
                "delivery",
                OperationType::Purchase,
            ))
            .await
            .unwrap();
        assert_eq!(outcome.product.quantity, 25);
        assert_eq!(outcome.entry.increase(), 15);
    }

    #[tokio::test]
    async fn negative_result_fails_and_changes_nothing() {
        let h = harness().await;
        let product_id = create_product(&h, "P-3", 4, 1).await;
        let before = h.store.entry_count().await;

        for op in [
            OperationType::Sale,
            OperationType::Damage,
            OperationType::Transfer,
            OperationType::ManualAdjustment,
        ] {
            let err = h
                .stock
                .apply_stock_change(StockChange::adjust(product_id, -5, h.user_id, "oops", op))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        }

        assert_eq!(h.store.entry_count().await, before);
        let stored = h.store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 4);
    }

    #[tokio::test]
    async fn correction_clamps_at_zero() {
        let h = harness().await;
        let product_id = create_product(&h, "P-4", 4, 1).await;

        let outcome = h
            .stock
            .apply_stock_change(StockChange::adjust(
                product_id,
                -9,
                h.user_id,
                "stocktake",
                OperationType::Correction,
            ))
            .await
            .unwrap();
        assert_eq!(outcome.product.quantity, 0);
        assert_eq!(outcome.entry.new_quantity, 0);
    }

    #[tokio::test]
    async fn negative_target_is_rejected_even_for_correction() {
        let h = harness().await;
        let product_id = create_product(&h, "P-4b", 4, 1).await;
        let before = h.store.entry_count().await;

        let err = h
            .stock
            .apply_stock_change(StockChange::set(
                product_id,
                -5,
                h.user_id,
                "stocktake",
                OperationType::Correction,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert_eq!(h.store.entry_count().await, before);
        let stored = h.store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 4);
    }

    #[tokio::test]
    async fn blank_reason_is_invalid_input() {
        let h = harness().await;
        let product_id = create_product(&h, "P-5", 4, 1).await;

        let err = h
            .stock
            .apply_stock_change(StockChange::set(
                product_id,
                3,
                h.user_id,
                "   ",
                OperationType::Sale,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn unknown_product_or_user_is_not_found() {
        let h = harness().await;
        let product_id = create_product(&h, "P-6", 4, 1).await;

        let err = h
            .stock
            .apply_stock_change(StockChange::set(
                ProductId::new(),
                3,
                h.user_id,
                "sale",
                OperationType::Sale,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = h
            .stock
            .apply_stock_change(StockChange::set(
                product_id,
                3,
                UserId::new(),
                "sale",
                OperationType::Sale,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn failure_after_product_write_rolls_back() {
        let h = harness().await;
        let product_id = create_product(&h, "A-1", 30, 5).await;
        let before = h.store.entry_count().await;

        for point in [FailPoint::AfterProductWrite, FailPoint::AfterLedgerWrite] {
            h.store.set_fail_point(Some(point)).await;
            let err = h
                .stock
                .apply_stock_change(StockChange::set(
                    product_id,
                    10,
                    h.user_id,
                    "sale",
                    OperationType::Sale,
                ))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::StorageFailure);
            assert_eq!(err.to_string(), "storage operation failed");

            let stored = h.store.get_product(product_id).await.unwrap().unwrap();
            assert_eq!(stored.quantity, 30);
            assert_eq!(h.store.entry_count().await, before);
        }

        h.store.set_fail_point(None).await;
        let outcome = h
            .stock
            .apply_stock_change(StockChange::set(
                product_id,
                10,
                h.user_id,
                "sale",
                OperationType::Sale,
            ))
            .await
            .unwrap();
        assert_eq!(outcome.product.quantity, 10);
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_mutation() {
        let h = harness().await;
        let product_id = create_product(&h, "A-2", 30, 10).await;
        h.store.set_fail_notifications(true).await;

        let outcome = h
            .stock
            .apply_stock_change(StockChange::set(
                product_id,
                0,
                h.user_id,
                "sold out",
                OperationType::Sale,
            ))
            .await
            .unwrap();
        assert_eq!(outcome.product.quantity, 0);

        h.store.set_fail_notifications(false).await;
        assert!(h.store.list_notifications(false, 10).await.unwrap().is_empty());
    }
}

mod consistency {
    use super::*;

    #[tokio::test]
    async fn ledger_replays_to_current_quantity() {
        let h = harness().await;
        let product_id = create_product(&h, "C-1", 50, 10).await;

        let changes = [
            (-7, OperationType::Sale),
            (20, OperationType::Purchase),
            (-3, OperationType::Damage),
            (-10, OperationType::Transfer),
            (4, OperationType::ManualAdjustment),
        ];
        for (delta, op) in changes {
            h.stock
                .apply_stock_change(StockChange::adjust(product_id, delta, h.user_id, "move", op))
                .await
                .unwrap();
        }

        let report = h.ledger.verify_consistency(product_id).await.unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.entries, 6);
        assert_eq!(report.product_quantity, 54);
        assert_eq!(report.ledger_quantity, 54);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_changes_serialize() {
        let h = Arc::new(
            harness_with(StockConfig {
                max_retries: 256,
                ..Default::default()
            })
            .await,
        );
        let product_id = create_product(&h, "C-2", 100, 0).await;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let h = h.clone();
            handles.push(tokio::spawn(async move {
                h.stock
                    .apply_stock_change(StockChange::adjust(
                        product_id,
                        -2,
                        h.user_id,
                        "sale",
                        OperationType::Sale,
                    ))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = h.store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 50);

        let report = h.ledger.verify_consistency(product_id).await.unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.entries, 26);
    }
}

mod ledger_queries {
    use chrono::{Duration, Utc};
    use ledger_store::LedgerEntry;

    use super::*;

    #[tokio::test]
    async fn inverted_range_is_invalid_input() {
        let h = harness().await;
        let now = Utc::now();

        let err = h
            .ledger
            .query(LedgerQuery::new().between(now, now - Duration::hours(1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn limit_above_cap_is_invalid_input() {
        let h = harness().await;
        let err = h
            .ledger
            .query(LedgerQuery::new().limit(5_000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn no_matches_is_empty_page() {
        let h = harness().await;
        let page = h
            .ledger
            .query(LedgerQuery::for_product(ProductId::new()))
            .await
            .unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.limit, 100);
    }

    #[tokio::test]
    async fn filters_by_user_and_operation() {
        let h = harness().await;
        let product_id = create_product(&h, "Q-1", 100, 10).await;

        let other = User::new("other", UserRole::Manager);
        let other_id = other.id;
        h.store.insert_user(other).await.unwrap();

        for (user, op) in [
            (h.user_id, OperationType::Sale),
            (other_id, OperationType::Sale),
            (other_id, OperationType::Damage),
        ] {
            h.stock
                .apply_stock_change(StockChange::adjust(product_id, -1, user, "x", op))
                .await
                .unwrap();
        }

        let page = h
            .ledger
            .query(LedgerQuery::new().user_id(other_id))
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let page = h
            .ledger
            .query(
                LedgerQuery::for_product(product_id)
                    .operation_types(vec![OperationType::Sale, OperationType::Purchase]),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        // Newest first
        assert_eq!(page.entries[0].new_quantity, 98);
    }

    #[tokio::test]
    async fn history_paginates_and_requires_product() {
        let h = harness().await;
        let product_id = create_product(&h, "Q-2", 10, 1).await;
        for _ in 0..4 {
            h.stock
                .apply_stock_change(StockChange::adjust(
                    product_id,
                    1,
                    h.user_id,
                    "return",
                    OperationType::Purchase,
                ))
                .await
                .unwrap();
        }

        let page = h
            .ledger
            .product_history(product_id, Pagination::new(2, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].new_quantity, 13);

        let err = h
            .ledger
            .product_history(ProductId::new(), Pagination::all())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn purge_respects_retention_floor() {
        let h = harness().await;
        let product_id = create_product(&h, "R-1", 10, 1).await;

        h.store
            .seed_entry(
                LedgerEntry::builder()
                    .product_id(product_id)
                    .user_id(h.user_id)
                    .quantities(0, 0)
                    .operation_type(OperationType::Correction)
                    .created_at(Utc::now() - Duration::days(200))
                    .build(),
            )
            .await;

        let err = h.ledger.purge_expired(30).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert_eq!(h.ledger.purge_expired(90).await.unwrap(), 1);
        assert_eq!(h.store.count_entries(&LedgerQuery::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recent_entries_are_newest_first() {
        let h = harness().await;
        let product_id = create_product(&h, "R-2", 10, 1).await;
        h.stock
            .apply_stock_change(StockChange::set(
                product_id,
                7,
                h.user_id,
                "sale",
                OperationType::Sale,
            ))
            .await
            .unwrap();

        let recent = h.ledger.recent_entries(product_id, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].new_quantity, 7);

        assert!(h.ledger.recent_entries(product_id, 0).await.is_err());
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn out_of_stock_then_mark_read() {
        let h = harness().await;
        let product_id = create_product(&h, "N-1", 3, 2).await;
        h.stock
            .apply_stock_change(StockChange::set(
                product_id,
                0,
                h.user_id,
                "sold out",
                OperationType::Sale,
            ))
            .await
            .unwrap();

        let service = NotificationService::new(h.store.clone());
        let unread = service.list(true, 50).await.unwrap();
        let out = unread
            .iter()
            .find(|n| n.kind == NotificationType::OutOfStock)
            .unwrap();
        assert_eq!(out.product_id, product_id);

        service.mark_read(out.id).await.unwrap();
        let unread = service.list(true, 50).await.unwrap();
        assert!(unread.iter().all(|n| n.kind != NotificationType::OutOfStock));
    }

    #[tokio::test]
    async fn repeated_low_stock_is_deduplicated() {
        let h = harness().await;
        let product_id = create_product(&h, "N-2", 20, 10).await;

        for target in [9, 8, 7] {
            h.stock
                .apply_stock_change(StockChange::set(
                    product_id,
                    target,
                    h.user_id,
                    "sale",
                    OperationType::Sale,
                ))
                .await
                .unwrap();
        }

        let low: Vec<_> = h
            .store
            .list_notifications(true, 50)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == NotificationType::LowStock)
            .collect();
        assert_eq!(low.len(), 1);
    }
}
