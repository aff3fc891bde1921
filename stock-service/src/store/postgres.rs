use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, PgPool, Postgres, Transaction};

use super::{
    CategoryRecord, CategoryRemoval, NewSale, ProductDraft, ProductRecord, SaleRecord,
    StockLevel, StockStore, StockTx, StoreResult,
};
use crate::status::{CategoryStatus, StockStatus};

pub(crate) const LOCK_PRODUCT_SQL: &str = "SELECT current_stock, minimum_stock, price \
     FROM products WHERE id = $1 AND user_id = $2 FOR UPDATE";

pub(crate) const LIST_PRODUCTS_SQL: &str = "SELECT p.id, p.name, p.category_id, c.name AS category, \
     p.current_stock, p.minimum_stock, p.price, p.status \
     FROM products p INNER JOIN categories c ON p.category_id = c.id \
     WHERE p.user_id = $1 AND c.status = 'active' ORDER BY p.id";

const GET_PRODUCT_SQL: &str = "SELECT p.id, p.name, p.category_id, c.name AS category, \
     p.current_stock, p.minimum_stock, p.price, p.status \
     FROM products p INNER JOIN categories c ON p.category_id = c.id \
     WHERE p.id = $1 AND p.user_id = $2";

/// Shared lock so a concurrent category delete waits for the product write to commit.
pub(crate) const CATEGORY_EXISTS_SQL: &str =
    "SELECT 1 FROM categories WHERE id = $1 AND user_id = $2 FOR SHARE";

const LIST_SALES_SQL: &str = "SELECT id, product_id, quantity, amount, sale_date FROM sales_history \
     WHERE user_id = $1 AND ($2::BIGINT IS NULL OR product_id = $2) \
     ORDER BY sale_date DESC, id DESC";

/// Postgres-backed store. Row locks come from `SELECT ... FOR UPDATE` inside each transaction.
#[derive(Clone)]
pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct PgStockTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn begin(&self) -> StoreResult<Box<dyn StockTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStockTx { tx }))
    }

    async fn list_products(&self, user_id: i64) -> StoreResult<Vec<ProductRecord>> {
        let rows = query_as::<_, ProductRecord>(LIST_PRODUCTS_SQL)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_product(&self, user_id: i64, product_id: i64) -> StoreResult<Option<ProductRecord>> {
        let row = query_as::<_, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_sales(&self, user_id: i64, product_id: Option<i64>) -> StoreResult<Vec<SaleRecord>> {
        let rows = query_as::<_, SaleRecord>(LIST_SALES_SQL)
            .bind(user_id)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_categories(&self, user_id: i64) -> StoreResult<Vec<CategoryRecord>> {
        let rows = query_as::<_, CategoryRecord>(
            "SELECT id, name, status FROM categories WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_category(&self, user_id: i64, name: &str) -> StoreResult<i64> {
        let id = query_scalar::<_, i64>(
            "INSERT INTO categories (user_id, name, status) VALUES ($1, $2, 'active') RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn rename_category(&self, user_id: i64, category_id: i64, name: &str) -> StoreResult<u64> {
        let result = query("UPDATE categories SET name = $1 WHERE id = $2 AND user_id = $3")
            .bind(name)
            .bind(category_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_category_status(
        &self,
        user_id: i64,
        category_id: i64,
        status: CategoryStatus,
    ) -> StoreResult<u64> {
        let result = query("UPDATE categories SET status = $1 WHERE id = $2 AND user_id = $3")
            .bind(status.as_str())
            .bind(category_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_category(&self, user_id: i64, category_id: i64) -> StoreResult<CategoryRemoval> {
        let mut tx = self.pool.begin().await?;

        let found = query_scalar::<_, i64>(
            "SELECT id FROM categories WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if found.is_none() {
            return Ok(CategoryRemoval::Missing);
        }

        let in_use = query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&mut *tx)
            .await?;
        if in_use > 0 {
            return Ok(CategoryRemoval::InUse);
        }

        query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(category_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(CategoryRemoval::Deleted)
    }
}

#[async_trait]
impl StockTx for PgStockTx {
    async fn lock_product(&mut self, user_id: i64, product_id: i64) -> StoreResult<Option<StockLevel>> {
        let level = query_as::<_, StockLevel>(LOCK_PRODUCT_SQL)
            .bind(product_id)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(level)
    }

    async fn category_exists(&mut self, user_id: i64, category_id: i64) -> StoreResult<bool> {
        let found = query_scalar::<_, i32>(CATEGORY_EXISTS_SQL)
            .bind(category_id)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(found.is_some())
    }

    async fn insert_product(
        &mut self,
        user_id: i64,
        draft: &ProductDraft,
        status: StockStatus,
    ) -> StoreResult<i64> {
        let id = query_scalar::<_, i64>(
            "INSERT INTO products (user_id, name, category_id, current_stock, minimum_stock, price, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(user_id)
        .bind(&draft.name)
        .bind(draft.category_id)
        .bind(draft.current_stock)
        .bind(draft.minimum_stock)
        .bind(&draft.price)
        .bind(status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn write_stock(
        &mut self,
        user_id: i64,
        product_id: i64,
        current_stock: i32,
        status: StockStatus,
    ) -> StoreResult<()> {
        query(
            "UPDATE products SET current_stock = $1, status = $2, updated_at = NOW() \
             WHERE id = $3 AND user_id = $4",
        )
        .bind(current_stock)
        .bind(status.as_str())
        .bind(product_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn overwrite_product(
        &mut self,
        user_id: i64,
        product_id: i64,
        draft: &ProductDraft,
        status: StockStatus,
    ) -> StoreResult<u64> {
        let result = query(
            "UPDATE products SET name = $1, category_id = $2, current_stock = $3, minimum_stock = $4, \
             price = $5, status = $6, updated_at = NOW() WHERE id = $7 AND user_id = $8",
        )
        .bind(&draft.name)
        .bind(draft.category_id)
        .bind(draft.current_stock)
        .bind(draft.minimum_stock)
        .bind(&draft.price)
        .bind(status.as_str())
        .bind(product_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_product(&mut self, user_id: i64, product_id: i64) -> StoreResult<u64> {
        let result = query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_sale(&mut self, user_id: i64, sale: &NewSale) -> StoreResult<i64> {
        let id = query_scalar::<_, i64>(
            "INSERT INTO sales_history (product_id, user_id, quantity, amount, sale_date) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(sale.product_id)
        .bind(user_id)
        .bind(sale.quantity)
        .bind(&sale.amount)
        .bind(sale.sale_date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgStockTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
