use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use common_money::{line_total, non_negative_price, normalize_scale};
use common_observability::StockMetrics;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{StockError, StockResult};
use crate::status::{derive_status, CategoryStatus, StockStatus};
use crate::store::{
    CategoryRecord, CategoryRemoval, NewSale, ProductDraft, ProductRecord, SaleRecord, StockStore,
};

/// Product fields as received from a client. Every field is required; `status` is never read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    #[serde(alias = "categoryId")]
    pub category_id: Option<i64>,
    #[serde(alias = "currentStock")]
    pub current_stock: Option<i32>,
    pub price: Option<BigDecimal>,
    #[serde(alias = "minimumStock")]
    pub minimum_stock: Option<i32>,
}

impl ProductInput {
    pub fn into_draft(self) -> StockResult<ProductDraft> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StockError::validation("name is required"))?;
        let category_id = self
            .category_id
            .ok_or_else(|| StockError::validation("category_id is required"))?;
        let current_stock = self
            .current_stock
            .ok_or_else(|| StockError::validation("current_stock is required"))?;
        let minimum_stock = self
            .minimum_stock
            .ok_or_else(|| StockError::validation("minimum_stock is required"))?;
        let price = self
            .price
            .ok_or_else(|| StockError::validation("price is required"))?;

        if current_stock < 0 {
            return Err(StockError::validation("current_stock must not be negative"));
        }
        if minimum_stock < 0 {
            return Err(StockError::validation("minimum_stock must not be negative"));
        }
        let price = non_negative_price(&price)
            .map_err(|e| StockError::validation(e.to_string()))?
            .into_inner();

        Ok(ProductDraft {
            name,
            category_id,
            current_stock,
            minimum_stock,
            price,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub current_stock: i32,
    pub status: StockStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total: BigDecimal,
    pub sale_date: NaiveDate,
    pub current_stock: i32,
    pub status: StockStatus,
}

/// Runs every stock mutation inside one store transaction holding the product row lock.
#[derive(Clone)]
pub struct StockEngine {
    store: Arc<dyn StockStore>,
    metrics: Arc<StockMetrics>,
}

impl StockEngine {
    pub fn new(store: Arc<dyn StockStore>, metrics: Arc<StockMetrics>) -> Self {
        Self { store, metrics }
    }

    pub async fn create_product(&self, user_id: i64, input: ProductInput) -> StockResult<i64> {
        let draft = input.into_draft()?;
        let mut tx = self.store.begin().await?;
        if !tx.category_exists(user_id, draft.category_id).await? {
            return Err(StockError::category_not_found(draft.category_id));
        }
        let status = derive_status(draft.current_stock, draft.minimum_stock);
        let product_id = tx.insert_product(user_id, &draft, status).await?;
        tx.commit().await?;
        info!(user_id, product_id, status = status.as_str(), "product created");
        Ok(product_id)
    }

    /// Adds `delta` (any sign) to the stock. A negative result is stored as is.
    pub async fn replenish(&self, user_id: i64, product_id: i64, delta: i32) -> StockResult<StockChange> {
        let mut tx = self.store.begin().await?;
        let level = tx
            .lock_product(user_id, product_id)
            .await?
            .ok_or_else(|| StockError::product_not_found(product_id))?;

        let current_stock = level
            .current_stock
            .checked_add(delta)
            .ok_or_else(|| StockError::validation("quantity overflows stock level"))?;
        let status = derive_status(current_stock, level.minimum_stock);
        tx.write_stock(user_id, product_id, current_stock, status).await?;
        tx.commit().await?;

        self.metrics.replenishments.inc();
        info!(user_id, product_id, delta, current_stock, status = status.as_str(), "stock replenished");
        Ok(StockChange { current_stock, status })
    }

    pub async fn sell_product(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
        sale_date: NaiveDate,
    ) -> StockResult<SaleReceipt> {
        if quantity <= 0 {
            return Err(StockError::validation("quantity must be positive"));
        }

        let mut tx = self.store.begin().await?;
        let level = tx
            .lock_product(user_id, product_id)
            .await?
            .ok_or_else(|| StockError::product_not_found(product_id))?;

        let current_stock = level.current_stock.saturating_sub(quantity);
        if current_stock < 0 {
            self.metrics.insufficient_stock_rejections.inc();
            warn!(user_id, product_id, requested = quantity, available = level.current_stock, "insufficient stock");
            return Err(StockError::InsufficientStock {
                product_id,
                requested: quantity,
                available: level.current_stock,
            });
        }

        let status = derive_status(current_stock, level.minimum_stock);
        tx.write_stock(user_id, product_id, current_stock, status).await?;

        let unit_price = normalize_scale(&level.price);
        let sale = NewSale {
            product_id,
            quantity,
            amount: unit_price.clone(),
            sale_date,
        };
        let sale_id = tx.insert_sale(user_id, &sale).await?;
        tx.commit().await?;

        self.metrics.record_sale(quantity);
        info!(user_id, product_id, sale_id, quantity, current_stock, status = status.as_str(), "sale recorded");
        Ok(SaleReceipt {
            sale_id,
            product_id,
            quantity,
            total: line_total(&unit_price, quantity),
            unit_price,
            sale_date,
            current_stock,
            status,
        })
    }

    pub async fn edit_product(
        &self,
        user_id: i64,
        product_id: i64,
        input: ProductInput,
    ) -> StockResult<StockStatus> {
        let draft = input.into_draft()?;
        let mut tx = self.store.begin().await?;
        if tx.lock_product(user_id, product_id).await?.is_none() {
            return Err(StockError::product_not_found(product_id));
        }
        if !tx.category_exists(user_id, draft.category_id).await? {
            return Err(StockError::category_not_found(draft.category_id));
        }
        let status = derive_status(draft.current_stock, draft.minimum_stock);
        let rows = tx.overwrite_product(user_id, product_id, &draft, status).await?;
        if rows == 0 {
            return Err(StockError::product_not_found(product_id));
        }
        tx.commit().await?;
        info!(user_id, product_id, status = status.as_str(), "product updated");
        Ok(status)
    }

    pub async fn delete_product(&self, user_id: i64, product_id: i64) -> StockResult<()> {
        let mut tx = self.store.begin().await?;
        let rows = tx.delete_product(user_id, product_id).await?;
        if rows == 0 {
            return Err(StockError::product_not_found(product_id));
        }
        tx.commit().await?;
        info!(user_id, product_id, "product deleted");
        Ok(())
    }

    pub async fn get_product(&self, user_id: i64, product_id: i64) -> StockResult<ProductRecord> {
        self.store
            .get_product(user_id, product_id)
            .await?
            .ok_or_else(|| StockError::product_not_found(product_id))
    }

    pub async fn list_products(&self, user_id: i64) -> StockResult<Vec<ProductRecord>> {
        Ok(self.store.list_products(user_id).await?)
    }

    pub async fn list_sales(&self, user_id: i64, product_id: Option<i64>) -> StockResult<Vec<SaleRecord>> {
        Ok(self.store.list_sales(user_id, product_id).await?)
    }

    pub async fn list_categories(&self, user_id: i64) -> StockResult<Vec<CategoryRecord>> {
        Ok(self.store.list_categories(user_id).await?)
    }

    pub async fn create_category(&self, user_id: i64, name: Option<String>) -> StockResult<i64> {
        let name = category_name(name)?;
        let category_id = self.store.insert_category(user_id, &name).await?;
        info!(user_id, category_id, "category created");
        Ok(category_id)
    }

    pub async fn rename_category(&self, user_id: i64, category_id: i64, name: Option<String>) -> StockResult<()> {
        let name = category_name(name)?;
        if self.store.rename_category(user_id, category_id, &name).await? == 0 {
            return Err(StockError::category_not_found(category_id));
        }
        Ok(())
    }

    pub async fn set_category_status(
        &self,
        user_id: i64,
        category_id: i64,
        status: Option<String>,
    ) -> StockResult<CategoryStatus> {
        let status = status
            .as_deref()
            .map(str::trim)
            .and_then(CategoryStatus::from_str)
            .ok_or_else(|| StockError::validation("status must be 'active' or 'inactive'"))?;
        if self.store.set_category_status(user_id, category_id, status).await? == 0 {
            return Err(StockError::category_not_found(category_id));
        }
        info!(user_id, category_id, status = status.as_str(), "category status changed");
        Ok(status)
    }

    pub async fn delete_category(&self, user_id: i64, category_id: i64) -> StockResult<()> {
        match self.store.delete_category(user_id, category_id).await? {
            CategoryRemoval::Deleted => Ok(()),
            CategoryRemoval::Missing => Err(StockError::category_not_found(category_id)),
            CategoryRemoval::InUse => Err(StockError::Conflict {
                code: "category_in_use",
                message: format!("category {category_id} still has products"),
            }),
        }
    }
}

fn category_name(name: Option<String>) -> StockResult<String> {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| StockError::validation("name is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input() -> ProductInput {
        ProductInput {
            name: Some("  Lamp ".into()),
            category_id: Some(1),
            current_stock: Some(3),
            price: Some(BigDecimal::from_str("9.999").unwrap()),
            minimum_stock: Some(1),
        }
    }

    #[test]
    fn draft_trims_name_and_normalizes_price() {
        let draft = input().into_draft().expect("valid");
        assert_eq!(draft.name, "Lamp");
        assert_eq!(draft.price.to_string(), "9.99");
    }

    #[test]
    fn missing_field_is_validation_error() {
        let mut missing = input();
        missing.price = None;
        assert!(matches!(missing.into_draft(), Err(StockError::Validation(_))));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut blank = input();
        blank.name = Some("   ".into());
        assert!(matches!(blank.into_draft(), Err(StockError::Validation(_))));
    }

    #[test]
    fn negative_values_are_rejected() {
        let mut stock = input();
        stock.current_stock = Some(-1);
        assert!(stock.into_draft().is_err());

        let mut minimum = input();
        minimum.minimum_stock = Some(-1);
        assert!(minimum.into_draft().is_err());

        let mut price = input();
        price.price = Some(BigDecimal::from_str("-0.50").unwrap());
        assert!(price.into_draft().is_err());
    }

    #[test]
    fn status_in_payload_is_ignored() {
        let parsed: ProductInput = serde_json::from_value(serde_json::json!({
            "name": "Cable",
            "categoryId": 2,
            "currentStock": 0,
            "price": "1.50",
            "minimumStock": 5,
            "status": "available"
        }))
        .expect("deserialize");
        let draft = parsed.into_draft().expect("valid");
        assert_eq!(derive_status(draft.current_stock, draft.minimum_stock), StockStatus::Finished);
    }
}
