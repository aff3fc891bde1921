pub mod app;
pub mod category_handlers;
pub mod config;
pub mod dashboard_handlers;
pub mod engine;
pub mod error;
pub mod product_handlers;
pub mod sale_handlers;
pub mod status;
pub mod store;
pub mod user_handlers;

pub use app::{build_router, AppState};
pub use engine::{ProductInput, SaleReceipt, StockChange, StockEngine};
pub use error::{StockError, StockResult};
pub use status::{derive_status, CategoryStatus, StockStatus};
pub use store::{MemoryStockStore, PgStockStore, StockStore};

/// Embedded schema migrations for the service database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
