use serde::{Deserialize, Serialize};

/// Stock level label stored alongside every product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Available,
    Low,
    Finished,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "available",
            StockStatus::Low => "low",
            StockStatus::Finished => "finished",
        }
    }

    pub fn from_str(s: &str) -> Option<StockStatus> {
        match s {
            "available" => Some(StockStatus::Available),
            "low" => Some(StockStatus::Low),
            "finished" => Some(StockStatus::Finished),
            _ => None,
        }
    }
}

/// Derives the status for a stock pair. Zero stock wins over every other rule.
pub fn derive_status(current_stock: i32, minimum_stock: i32) -> StockStatus {
    if current_stock == 0 {
        StockStatus::Finished
    } else if current_stock > minimum_stock {
        StockStatus::Available
    } else {
        StockStatus::Low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Active,
    Inactive,
}

impl CategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryStatus::Active => "active",
            CategoryStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<CategoryStatus> {
        match s {
            "active" => Some(CategoryStatus::Active),
            "inactive" => Some(CategoryStatus::Inactive),
            _ => None,
        }
    }
}
