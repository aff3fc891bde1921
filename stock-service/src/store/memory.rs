use std::collections::BTreeMap;
#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    CategoryRecord, CategoryRemoval, NewSale, ProductDraft, ProductRecord, SaleRecord,
    StockLevel, StockStore, StockTx, StoreResult,
};
#[cfg(any(test, feature = "test-utils"))]
use super::StoreError;
use crate::status::{CategoryStatus, StockStatus};

#[derive(Debug, Clone)]
struct StoredProduct {
    user_id: i64,
    name: String,
    category_id: i64,
    current_stock: i32,
    minimum_stock: i32,
    price: BigDecimal,
    status: StockStatus,
}

#[derive(Debug, Clone)]
struct StoredCategory {
    user_id: i64,
    name: String,
    status: CategoryStatus,
}

#[derive(Debug, Clone)]
struct StoredSale {
    id: i64,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    amount: BigDecimal,
    sale_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<i64, StoredProduct>,
    categories: BTreeMap<i64, StoredCategory>,
    sales: Vec<StoredSale>,
    last_product_id: i64,
    last_category_id: i64,
    last_sale_id: i64,
}

impl MemoryState {
    fn product_record(&self, id: i64, product: &StoredProduct) -> ProductRecord {
        let category = self
            .categories
            .get(&product.category_id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        ProductRecord {
            id,
            name: product.name.clone(),
            category_id: product.category_id,
            category,
            current_stock: product.current_stock,
            minimum_stock: product.minimum_stock,
            price: product.price.clone(),
            status: product.status.as_str().to_string(),
        }
    }

    fn owned_product_mut(&mut self, user_id: i64, product_id: i64) -> Option<&mut StoredProduct> {
        self.products
            .get_mut(&product_id)
            .filter(|p| p.user_id == user_id)
    }

    fn owned_category_mut(&mut self, user_id: i64, category_id: i64) -> Option<&mut StoredCategory> {
        self.categories
            .get_mut(&category_id)
            .filter(|c| c.user_id == user_id)
    }
}

/// In-process store with the same transactional guarantees as Postgres.
///
/// A transaction holds the state lock from `begin` until it is committed or dropped, and
/// writes land on a staged copy that only replaces the shared state on commit. Concurrent
/// mutations are therefore fully serialized.
#[derive(Clone, Default)]
pub struct MemoryStockStore {
    state: Arc<Mutex<MemoryState>>,
    #[cfg(any(test, feature = "test-utils"))]
    fail_next_sale_insert: Arc<AtomicBool>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `insert_sale` call fail once. Used to exercise rollback paths.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_next_sale_insert(&self) {
        self.fail_next_sale_insert.store(true, Ordering::SeqCst);
    }
}

struct MemoryStockTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    #[cfg(any(test, feature = "test-utils"))]
    fail_next_sale_insert: Arc<AtomicBool>,
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn begin(&self) -> StoreResult<Box<dyn StockTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryStockTx {
            guard,
            staged,
            #[cfg(any(test, feature = "test-utils"))]
            fail_next_sale_insert: self.fail_next_sale_insert.clone(),
        }))
    }

    async fn list_products(&self, user_id: i64) -> StoreResult<Vec<ProductRecord>> {
        let state = self.state.lock().await;
        let records = state
            .products
            .iter()
            .filter(|(_, p)| p.user_id == user_id)
            .filter(|(_, p)| {
                state
                    .categories
                    .get(&p.category_id)
                    .map(|c| c.status == CategoryStatus::Active)
                    .unwrap_or(false)
            })
            .map(|(id, p)| state.product_record(*id, p))
            .collect();
        Ok(records)
    }

    async fn get_product(&self, user_id: i64, product_id: i64) -> StoreResult<Option<ProductRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .get(&product_id)
            .filter(|p| p.user_id == user_id)
            .map(|p| state.product_record(product_id, p)))
    }

    async fn list_sales(&self, user_id: i64, product_id: Option<i64>) -> StoreResult<Vec<SaleRecord>> {
        let state = self.state.lock().await;
        let mut sales: Vec<SaleRecord> = state
            .sales
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| product_id.map_or(true, |id| s.product_id == id))
            .map(|s| SaleRecord {
                id: s.id,
                product_id: s.product_id,
                quantity: s.quantity,
                amount: s.amount.clone(),
                sale_date: s.sale_date,
            })
            .collect();
        sales.sort_by(|a, b| b.sale_date.cmp(&a.sale_date).then(b.id.cmp(&a.id)));
        Ok(sales)
    }

    async fn list_categories(&self, user_id: i64) -> StoreResult<Vec<CategoryRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .filter(|(_, c)| c.user_id == user_id)
            .map(|(id, c)| CategoryRecord {
                id: *id,
                name: c.name.clone(),
                status: c.status.as_str().to_string(),
            })
            .collect())
    }

    async fn insert_category(&self, user_id: i64, name: &str) -> StoreResult<i64> {
        let mut state = self.state.lock().await;
        state.last_category_id += 1;
        let id = state.last_category_id;
        state.categories.insert(
            id,
            StoredCategory {
                user_id,
                name: name.to_string(),
                status: CategoryStatus::Active,
            },
        );
        Ok(id)
    }

    async fn rename_category(&self, user_id: i64, category_id: i64, name: &str) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        Ok(match state.owned_category_mut(user_id, category_id) {
            Some(category) => {
                category.name = name.to_string();
                1
            }
            None => 0,
        })
    }

    async fn set_category_status(
        &self,
        user_id: i64,
        category_id: i64,
        status: CategoryStatus,
    ) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        Ok(match state.owned_category_mut(user_id, category_id) {
            Some(category) => {
                category.status = status;
                1
            }
            None => 0,
        })
    }

    async fn delete_category(&self, user_id: i64, category_id: i64) -> StoreResult<CategoryRemoval> {
        let mut state = self.state.lock().await;
        if state.owned_category_mut(user_id, category_id).is_none() {
            return Ok(CategoryRemoval::Missing);
        }
        if state.products.values().any(|p| p.category_id == category_id) {
            return Ok(CategoryRemoval::InUse);
        }
        state.categories.remove(&category_id);
        Ok(CategoryRemoval::Deleted)
    }
}

#[async_trait]
impl StockTx for MemoryStockTx {
    async fn lock_product(&mut self, user_id: i64, product_id: i64) -> StoreResult<Option<StockLevel>> {
        Ok(self
            .staged
            .owned_product_mut(user_id, product_id)
            .map(|p| StockLevel {
                current_stock: p.current_stock,
                minimum_stock: p.minimum_stock,
                price: p.price.clone(),
            }))
    }

    async fn category_exists(&mut self, user_id: i64, category_id: i64) -> StoreResult<bool> {
        Ok(self.staged.owned_category_mut(user_id, category_id).is_some())
    }

    async fn insert_product(
        &mut self,
        user_id: i64,
        draft: &ProductDraft,
        status: StockStatus,
    ) -> StoreResult<i64> {
        self.staged.last_product_id += 1;
        let id = self.staged.last_product_id;
        self.staged.products.insert(
            id,
            StoredProduct {
                user_id,
                name: draft.name.clone(),
                category_id: draft.category_id,
                current_stock: draft.current_stock,
                minimum_stock: draft.minimum_stock,
                price: draft.price.clone(),
                status,
            },
        );
        Ok(id)
    }

    async fn write_stock(
        &mut self,
        user_id: i64,
        product_id: i64,
        current_stock: i32,
        status: StockStatus,
    ) -> StoreResult<()> {
        if let Some(product) = self.staged.owned_product_mut(user_id, product_id) {
            product.current_stock = current_stock;
            product.status = status;
        }
        Ok(())
    }

    async fn overwrite_product(
        &mut self,
        user_id: i64,
        product_id: i64,
        draft: &ProductDraft,
        status: StockStatus,
    ) -> StoreResult<u64> {
        Ok(match self.staged.owned_product_mut(user_id, product_id) {
            Some(product) => {
                product.name = draft.name.clone();
                product.category_id = draft.category_id;
                product.current_stock = draft.current_stock;
                product.minimum_stock = draft.minimum_stock;
                product.price = draft.price.clone();
                product.status = status;
                1
            }
            None => 0,
        })
    }

    async fn delete_product(&mut self, user_id: i64, product_id: i64) -> StoreResult<u64> {
        if self.staged.owned_product_mut(user_id, product_id).is_none() {
            return Ok(0);
        }
        self.staged.products.remove(&product_id);
        Ok(1)
    }

    async fn insert_sale(&mut self, user_id: i64, sale: &NewSale) -> StoreResult<i64> {
        #[cfg(any(test, feature = "test-utils"))]
        if self.fail_next_sale_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Injected("sale insert"));
        }
        self.staged.last_sale_id += 1;
        let id = self.staged.last_sale_id;
        self.staged.sales.push(StoredSale {
            id,
            user_id,
            product_id: sale.product_id,
            quantity: sale.quantity,
            amount: sale.amount.clone(),
            sale_date: sale.sale_date,
        });
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryStockTx { mut guard, staged, .. } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(category_id: i64) -> ProductDraft {
        ProductDraft {
            name: "Widget".into(),
            category_id,
            current_stock: 4,
            minimum_stock: 1,
            price: BigDecimal::from(3),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = MemoryStockStore::new();
        let category_id = store.insert_category(1, "Tools").await.unwrap();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_product(1, &draft(category_id), StockStatus::Available)
                .await
                .unwrap();
        }
        assert!(store.list_products(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = MemoryStockStore::new();
        let category_id = store.insert_category(1, "Tools").await.unwrap();
        let mut tx = store.begin().await.unwrap();
        let id = tx
            .insert_product(1, &draft(category_id), StockStatus::Available)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let product = store.get_product(1, id).await.unwrap().expect("product");
        assert_eq!(product.category, "Tools");
        assert!(store.get_product(2, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_sale_failure_fires_once() {
        let store = MemoryStockStore::new();
        store.fail_next_sale_insert();
        let sale = NewSale {
            product_id: 1,
            quantity: 1,
            amount: BigDecimal::from(1),
            sale_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_sale(1, &sale).await.is_err());
        assert!(tx.insert_sale(1, &sale).await.is_ok());
    }

    #[tokio::test]
    async fn category_with_products_is_not_deleted() {
        let store = MemoryStockStore::new();
        let category_id = store.insert_category(1, "Tools").await.unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(1, &draft(category_id), StockStatus::Available)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.delete_category(1, category_id).await.unwrap(),
            CategoryRemoval::InUse
        );
        assert_eq!(store.delete_category(1, 999).await.unwrap(), CategoryRemoval::Missing);
    }
}
