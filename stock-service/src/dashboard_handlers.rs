use axum::extract::State;
use axum::Json;
use bigdecimal::BigDecimal;
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use serde::Serialize;
use sqlx::{query_as, FromRow};

use crate::app::AppState;

pub(crate) const STATS_SQL: &str = "SELECT \
     (SELECT COUNT(*) FROM products WHERE user_id = $1) AS total_products, \
     (SELECT COUNT(*) FROM products WHERE user_id = $1 AND current_stock <= minimum_stock) AS low_stock_items, \
     (SELECT COUNT(*) FROM categories WHERE user_id = $1) AS total_categories, \
     (SELECT COALESCE(SUM(current_stock * price), 0) FROM products WHERE user_id = $1) AS total_value";

pub(crate) const STOCK_BY_CATEGORY_SQL: &str = "SELECT c.name, COALESCE(SUM(p.current_stock), 0)::BIGINT AS total_stock \
     FROM products p INNER JOIN categories c ON p.category_id = c.id \
     WHERE p.user_id = $1 GROUP BY c.id, c.name ORDER BY total_stock DESC LIMIT 5";

/// Revenue per month over the trailing six months, oldest month first.
pub(crate) const SALES_TREND_SQL: &str = "SELECT to_char(sale_date, 'YYYY-MM') AS month, \
     COALESCE(SUM(quantity * amount), 0) AS sales \
     FROM sales_history \
     WHERE user_id = $1 AND sale_date >= (CURRENT_DATE - INTERVAL '6 months') \
     GROUP BY 1 ORDER BY 1 ASC";

pub(crate) const LOW_STOCK_SQL: &str = "SELECT id, name, current_stock, minimum_stock AS minimum_required \
     FROM products WHERE user_id = $1 AND current_stock <= minimum_stock \
     ORDER BY (current_stock::NUMERIC / NULLIF(minimum_stock, 0)) ASC NULLS FIRST, id";

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: i64,
    pub low_stock_items: i64,
    pub total_categories: i64,
    pub total_value: BigDecimal,
}

#[derive(Debug, FromRow)]
struct CategoryStockRow {
    name: String,
    total_stock: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockByCategory {
    pub categories: Vec<String>,
    pub stock_levels: Vec<i64>,
}

#[derive(Debug, FromRow)]
struct MonthlySalesRow {
    month: String,
    sales: BigDecimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesTrend {
    pub months: Vec<String>,
    pub sales_data: Vec<BigDecimal>,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub id: i64,
    pub name: String,
    pub current_stock: i32,
    pub minimum_required: i32,
}

pub async fn stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DashboardStats>> {
    let stats = query_as::<_, DashboardStats>(STATS_SQL)
        .bind(auth.user_id())
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(stats))
}

pub async fn stock_by_category(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<StockByCategory>> {
    let rows = query_as::<_, CategoryStockRow>(STOCK_BY_CATEGORY_SQL)
        .bind(auth.user_id())
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::internal)?;
    let (categories, stock_levels) = rows.into_iter().map(|r| (r.name, r.total_stock)).unzip();
    Ok(Json(StockByCategory { categories, stock_levels }))
}

pub async fn sales_trend(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<SalesTrend>> {
    let rows = query_as::<_, MonthlySalesRow>(SALES_TREND_SQL)
        .bind(auth.user_id())
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::internal)?;
    let (months, sales_data) = rows.into_iter().map(|r| (r.month, r.sales)).unzip();
    Ok(Json(SalesTrend { months, sales_data }))
}

pub async fn low_stock(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<LowStockItem>>> {
    let items = query_as::<_, LowStockItem>(LOW_STOCK_SQL)
        .bind(auth.user_id())
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dashboard_query_is_scoped_by_user() {
        for sql in [STATS_SQL, STOCK_BY_CATEGORY_SQL, SALES_TREND_SQL, LOW_STOCK_SQL] {
            assert!(sql.contains("user_id = $1"), "unscoped query: {sql}");
        }
    }

    #[test]
    fn sales_trend_weights_unit_price_by_quantity() {
        assert!(SALES_TREND_SQL.contains("SUM(quantity * amount)"));
        assert!(SALES_TREND_SQL.contains("INTERVAL '6 months'"));
    }

    #[test]
    fn stock_by_category_serializes_parallel_arrays() {
        let body = serde_json::to_value(StockByCategory {
            categories: vec!["Tools".into()],
            stock_levels: vec![12],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"categories": ["Tools"], "stockLevels": [12]}));
    }
}
