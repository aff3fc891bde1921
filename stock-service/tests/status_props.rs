use proptest::prelude::*;
use stock_service::{derive_status, StockStatus};

proptest! {
    #[test]
    fn zero_stock_is_always_finished(minimum in 0i32..10_000) {
        prop_assert_eq!(derive_status(0, minimum), StockStatus::Finished);
    }

    #[test]
    fn status_partitions_positive_stock(current in 1i32..100_000, minimum in 0i32..100_000) {
        let status = derive_status(current, minimum);
        if current > minimum {
            prop_assert_eq!(status, StockStatus::Available);
        } else {
            prop_assert_eq!(status, StockStatus::Low);
        }
    }

    #[test]
    fn negative_stock_is_low(current in i32::MIN..0, minimum in 0i32..1_000) {
        prop_assert_eq!(derive_status(current, minimum), StockStatus::Low);
    }
}
