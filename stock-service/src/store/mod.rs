use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::status::{CategoryStatus, StockStatus};

mod memory;
mod postgres;

pub use memory::MemoryStockStore;
pub use postgres::PgStockStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[cfg(any(test, feature = "test-utils"))]
    #[error("injected failure: {0}")]
    Injected(&'static str),
}

/// Validated product fields, shared by create and edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub category_id: i64,
    pub current_stock: i32,
    pub minimum_stock: i32,
    pub price: BigDecimal,
}

/// Row snapshot taken under the product lock.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockLevel {
    pub current_stock: i32,
    pub minimum_stock: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub product_id: i64,
    pub quantity: i32,
    pub amount: BigDecimal,
    pub sale_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub category: String,
    pub current_stock: i32,
    pub minimum_stock: i32,
    pub price: BigDecimal,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SaleRecord {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub amount: BigDecimal,
    pub sale_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRemoval {
    Deleted,
    Missing,
    InUse,
}

/// Pooled entry point. Mutations go through [`StockTx`]; reads do not need one.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StockTx>>;

    /// Products in active categories, joined with their category name.
    async fn list_products(&self, user_id: i64) -> StoreResult<Vec<ProductRecord>>;
    async fn get_product(&self, user_id: i64, product_id: i64) -> StoreResult<Option<ProductRecord>>;
    /// Newest first.
    async fn list_sales(&self, user_id: i64, product_id: Option<i64>) -> StoreResult<Vec<SaleRecord>>;

    async fn list_categories(&self, user_id: i64) -> StoreResult<Vec<CategoryRecord>>;
    async fn insert_category(&self, user_id: i64, name: &str) -> StoreResult<i64>;
    async fn rename_category(&self, user_id: i64, category_id: i64, name: &str) -> StoreResult<u64>;
    async fn set_category_status(
        &self,
        user_id: i64,
        category_id: i64,
        status: CategoryStatus,
    ) -> StoreResult<u64>;
    /// Refuses to delete a category that still has products.
    async fn delete_category(&self, user_id: i64, category_id: i64) -> StoreResult<CategoryRemoval>;
}

/// One store transaction. Dropping it without calling `commit` rolls every write back.
#[async_trait]
pub trait StockTx: Send {
    /// Reads the product row and holds an exclusive lock on it until the transaction ends.
    async fn lock_product(&mut self, user_id: i64, product_id: i64) -> StoreResult<Option<StockLevel>>;
    async fn category_exists(&mut self, user_id: i64, category_id: i64) -> StoreResult<bool>;
    async fn insert_product(
        &mut self,
        user_id: i64,
        draft: &ProductDraft,
        status: StockStatus,
    ) -> StoreResult<i64>;
    async fn write_stock(
        &mut self,
        user_id: i64,
        product_id: i64,
        current_stock: i32,
        status: StockStatus,
    ) -> StoreResult<()>;
    async fn overwrite_product(
        &mut self,
        user_id: i64,
        product_id: i64,
        draft: &ProductDraft,
        status: StockStatus,
    ) -> StoreResult<u64>;
    async fn delete_product(&mut self, user_id: i64, product_id: i64) -> StoreResult<u64>;
    async fn insert_sale(&mut self, user_id: i64, sale: &NewSale) -> StoreResult<i64>;
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
