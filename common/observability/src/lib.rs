use prometheus::{IntCounter, IntCounterVec, Registry};

#[derive(Clone)]
pub struct StockMetrics {
    pub registry: Registry,
    pub sales_recorded: IntCounter,
    pub units_sold: IntCounter,
    pub insufficient_stock_rejections: IntCounter,
    pub replenishments: IntCounter,
    pub http_errors_total: IntCounterVec,
}

impl StockMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let sales_recorded = IntCounter::new(
            "stock_sales_recorded_total",
            "Sale records written",
        ).unwrap();
        let units_sold = IntCounter::new(
            "stock_units_sold_total",
            "Units removed from stock by completed sales",
        ).unwrap();
        let insufficient_stock_rejections = IntCounter::new(
            "stock_insufficient_rejections_total",
            "Sell requests rejected because stock would go negative",
        ).unwrap();
        let replenishments = IntCounter::new(
            "stock_replenishments_total",
            "Replenish operations applied",
        ).unwrap();
        let http_errors_total = IntCounterVec::new(
            prometheus::Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)"
            ),
            &["service", "code", "status"]
        ).unwrap();
        let _ = registry.register(Box::new(sales_recorded.clone()));
        let _ = registry.register(Box::new(units_sold.clone()));
        let _ = registry.register(Box::new(insufficient_stock_rejections.clone()));
        let _ = registry.register(Box::new(replenishments.clone()));
        let _ = registry.register(Box::new(http_errors_total.clone()));
        StockMetrics { registry, sales_recorded, units_sold, insufficient_stock_rejections, replenishments, http_errors_total }
    }

    pub fn record_sale(&self, quantity: i32) {
        self.sales_recorded.inc();
        if quantity > 0 {
            self.units_sold.inc_by(quantity as u64);
        }
    }
}

impl Default for StockMetrics {
    fn default() -> Self { Self::new() }
}
