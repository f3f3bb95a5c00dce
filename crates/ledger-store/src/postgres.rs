use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EntryId, Money, NotificationId, ProductId, UserId};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    LedgerEntry, LedgerQuery, Notification, NotificationType, Pagination, Product, ProductFilter,
    ProductUpdate, Result, SortOrder, StoreError, User, Version,
    store::{
        EntryStream, LedgerStore, NotificationStore, ProductStore, StockMutation, UserStore,
        validate_initial_entry, validate_mutation,
    },
};

const ENTRY_COLUMNS: &str =
    "id, product_id, user_id, old_quantity, new_quantity, reason, operation_type, created_at, seq";

const PRODUCT_COLUMNS: &str = "id, sku, name, category, unit_price_cents, quantity, reorder_level, location, supplier, version, created_at, updated_at";

/// Rows fetched per round trip when streaming entries.
const STREAM_PAGE_SIZE: i64 = 500;

/// PostgreSQL-backed implementation of every store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn row_to_entry(row: &PgRow) -> Result<LedgerEntry> {
    let operation_type: String = row.try_get("operation_type")?;
    Ok(LedgerEntry {
        id: EntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        old_quantity: row.try_get("old_quantity")?,
        new_quantity: row.try_get("new_quantity")?,
        reason: row.try_get("reason")?,
        operation_type: operation_type
            .parse()
            .map_err(|e: common::ParseTagError| StoreError::CorruptRow(e.to_string()))?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        quantity: row.try_get("quantity")?,
        reorder_level: row.try_get("reorder_level")?,
        location: row.try_get("location")?,
        supplier: row.try_get("supplier")?,
        version: Version::new(row.try_get("version")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_notification(row: &PgRow) -> Result<Notification> {
    let kind: String = row.try_get("kind")?;
    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        kind: kind
            .parse()
            .map_err(|e: common::ParseTagError| StoreError::CorruptRow(e.to_string()))?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn push_entry_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &LedgerQuery) {
    if let Some(id) = query.product_id {
        builder.push(" AND product_id = ").push_bind(id.as_uuid());
    }
    if let Some(id) = query.user_id {
        builder.push(" AND user_id = ").push_bind(id.as_uuid());
    }
    if let Some(ref types) = query.operation_types {
        let names: Vec<String> = types.iter().map(|t| t.as_str().to_string()).collect();
        builder
            .push(" AND operation_type = ANY(")
            .push_bind(names)
            .push(")");
    }
    if let Some(from) = query.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}

fn push_product_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(ref category) = filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(ref location) = filter.location {
        builder.push(" AND location = ").push_bind(location.clone());
    }
    if let Some(ref supplier) = filter.supplier {
        builder.push(" AND supplier = ").push_bind(supplier.clone());
    }
    if filter.low_stock_only {
        builder.push(" AND quantity <= reorder_level");
    }
    if let Some(ref search) = filter.search {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR sku ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn map_sku_violation(err: sqlx::Error, sku: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.constraint() == Some("products_sku_unique")
    {
        return StoreError::DuplicateSku(sku.to_string());
    }
    StoreError::Database(err)
}

/// Keyset cursor over `(created_at, seq)` used to stream entries page by page.
struct EntryCursor {
    pool: PgPool,
    query: LedgerQuery,
    after: Option<(DateTime<Utc>, i64)>,
    buffer: VecDeque<LedgerEntry>,
    exhausted: bool,
}

impl EntryCursor {
    async fn fetch_page(&mut self) -> Result<()> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE 1=1"));
        push_entry_filters(&mut builder, &self.query);
        if let Some((created_at, seq)) = self.after {
            builder
                .push(" AND (created_at, seq) > (")
                .push_bind(created_at)
                .push(", ")
                .push_bind(seq)
                .push(")");
        }
        builder
            .push(" ORDER BY created_at ASC, seq ASC LIMIT ")
            .push_bind(STREAM_PAGE_SIZE);

        let rows = builder.build().fetch_all(&self.pool).await?;
        if (rows.len() as i64) < STREAM_PAGE_SIZE {
            self.exhausted = true;
        }
        for row in rows {
            let seq: i64 = row.try_get("seq")?;
            let entry = row_to_entry(&row)?;
            self.after = Some((entry.created_at, seq));
            self.buffer.push_back(entry);
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn commit_mutation(&self, mutation: StockMutation) -> Result<Product> {
        validate_mutation(&mutation)?;

        let product_id = mutation.product_id;
        let entry = &mutation.entry;

        // Start a transaction
        let mut tx = self.pool.begin().await?;

        // The version predicate makes this a compare-and-swap; the UPDATE also
        // holds the row lock until commit.
        let updated: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE products
            SET quantity = $1, version = version + 1, updated_at = $2
            WHERE id = $3 AND version = $4
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(mutation.new_quantity)
        .bind(entry.created_at)
        .bind(product_id.as_uuid())
        .bind(mutation.expected_version.as_i64())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM products WHERE id = $1")
                    .bind(product_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;

            return match actual {
                None => Err(StoreError::product_not_found(product_id)),
                Some(actual) => Err(StoreError::ConcurrencyConflict {
                    product_id,
                    expected: mutation.expected_version,
                    actual: Version::new(actual),
                }),
            };
        };
        let product = row_to_product(&row)?;

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, product_id, user_id, old_quantity, new_quantity, reason, operation_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.product_id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.old_quantity)
        .bind(entry.new_quantity)
        .bind(&entry.reason)
        .bind(entry.operation_type.as_str())
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    async fn query_entries(&self, query: &LedgerQuery) -> Result<(Vec<LedgerEntry>, u64)> {
        // Count and page read from one snapshot.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM ledger_entries WHERE 1=1");
        push_entry_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut select =
            QueryBuilder::new(format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE 1=1"));
        push_entry_filters(&mut select, query);
        select.push(match query.order {
            SortOrder::NewestFirst => " ORDER BY created_at DESC, seq DESC",
            SortOrder::OldestFirst => " ORDER BY created_at ASC, seq ASC",
        });
        if let Some(limit) = query.limit {
            select.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            select.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = select.build().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let entries = rows.iter().map(row_to_entry).collect::<Result<Vec<_>>>()?;
        Ok((entries, total as u64))
    }

    async fn stream_entries(&self, query: &LedgerQuery) -> Result<EntryStream> {
        let cursor = EntryCursor {
            pool: self.pool.clone(),
            query: query.unpaged(),
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        let stream = futures_util::stream::try_unfold(cursor, |mut cursor| async move {
            if cursor.buffer.is_empty() && !cursor.exhausted {
                cursor.fetch_page().await?;
            }
            Ok::<_, StoreError>(cursor.buffer.pop_front().map(|entry| (entry, cursor)))
        });

        Ok(Box::pin(stream))
    }

    async fn purge_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
                .bind(sku)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn insert_product(
        &self,
        product: Product,
        initial_entry: Option<LedgerEntry>,
    ) -> Result<()> {
        if let Some(entry) = &initial_entry {
            validate_initial_entry(&product, entry)?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO products ({PRODUCT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#
        ))
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.unit_price.cents())
        .bind(product.quantity)
        .bind(product.reorder_level)
        .bind(&product.location)
        .bind(&product.supplier)
        .bind(product.version.as_i64())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sku_violation(e, &product.sku))?;

        if let Some(entry) = initial_entry {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries (id, product_id, user_id, old_quantity, new_quantity, reason, operation_type, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(entry.product_id.as_uuid())
            .bind(entry.user_id.as_uuid())
            .bind(entry.old_quantity)
            .bind(entry.new_quantity)
            .bind(&entry.reason)
            .bind(entry.operation_type.as_str())
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($1, name),
                category = COALESCE($2, category),
                unit_price_cents = COALESCE($3, unit_price_cents),
                reorder_level = COALESCE($4, reorder_level),
                location = COALESCE($5, location),
                supplier = COALESCE($6, supplier),
                updated_at = $7
            WHERE id = $8
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(update.name)
        .bind(update.category)
        .bind(update.unit_price.map(|p| p.cents()))
        .bind(update.reorder_level)
        .bind(update.location)
        .bind(update.supplier)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(StoreError::product_not_found(id)),
        }
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, u64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");
        push_product_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"));
        push_product_filters(&mut select, filter);
        select.push(" ORDER BY name ASC, sku ASC");
        if let Some(limit) = page.limit {
            select.push(" LIMIT ").push_bind(limit as i64);
        }
        select.push(" OFFSET ").push_bind(page.offset as i64);

        let rows = select.build().fetch_all(&self.pool).await?;
        let products = rows
            .iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok((products, total as u64))
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id, username, role, created_at FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => {
                let role: String = row.try_get("role")?;
                Ok(Some(User {
                    id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    username: row.try_get("username")?,
                    role: role
                        .parse()
                        .map_err(|e: common::ParseTagError| StoreError::CorruptRow(e.to_string()))?,
                    created_at: row.try_get("created_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, role, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                role = EXCLUDED.role
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn create_if_absent(
        &self,
        product_id: ProductId,
        kind: NotificationType,
    ) -> Result<bool> {
        let notification = Notification::new(product_id, kind);
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, product_id, kind, is_read, created_at)
            VALUES ($1, $2, $3, FALSE, $4)
            ON CONFLICT (product_id, kind) WHERE NOT is_read DO NOTHING
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(kind.as_str())
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_notifications(
        &self,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, kind, is_read, created_at
            FROM notifications
            WHERE ($1 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(unread_only)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
