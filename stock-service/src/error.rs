use common_http_errors::ApiError;
use thiserror::Error;

use crate::store::StoreError;

pub type StockResult<T> = Result<T, StockError>;

/// Which kind of row a not-found error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Product,
    Category,
}

impl Entity {
    pub fn not_found_code(&self) -> &'static str {
        match self {
            Entity::Product => "product_not_found",
            Entity::Category => "category_not_found",
        }
    }
}

#[derive(Debug, Error)]
pub enum StockError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity:?} {id} not found")]
    NotFound { entity: Entity, id: i64 },
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i32,
        available: i32,
    },
    #[error("conflict: {message}")]
    Conflict { code: &'static str, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StockError {
    pub fn validation(message: impl Into<String>) -> Self {
        StockError::Validation(message.into())
    }

    pub fn product_not_found(id: i64) -> Self {
        StockError::NotFound { entity: Entity::Product, id }
    }

    pub fn category_not_found(id: i64) -> Self {
        StockError::NotFound { entity: Entity::Category, id }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Validation(message) => ApiError::validation(message),
            StockError::NotFound { entity, .. } => ApiError::NotFound {
                code: entity.not_found_code(),
            },
            e @ StockError::InsufficientStock { .. } => ApiError::BadRequest {
                code: "insufficient_stock",
                message: Some(e.to_string()),
            },
            StockError::Conflict { code, message } => ApiError::Conflict {
                code,
                message: Some(message),
            },
            StockError::Store(e) => ApiError::internal(e),
        }
    }
}
