use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RiskMode;

/// Saved calculations kept per user; the oldest inserted entry goes first.
pub const CALCULATOR_HISTORY_CAP: usize = 50;

/// What the calculator solves for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SizingTarget {
    /// Size from explicit entry and stop prices.
    Units { entry: f64, stop: f64 },
    /// Notional from a stop distance in percent; entry optional.
    Value {
        stop_loss_percent: f64,
        #[serde(default)]
        entry: Option<f64>,
    },
}

impl SizingTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizingTarget::Units { .. } => "units",
            SizingTarget::Value { .. } => "value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingInput {
    pub balance: f64,
    pub risk_mode: RiskMode,
    /// Percent of balance or dollars, depending on `risk_mode`.
    pub risk_value: f64,
    pub target: SizingTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizingResult {
    pub valid: bool,
    pub position_size: f64,
    pub position_value: f64,
    pub dollar_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub input: SizingInput,
    pub result: SizingResult,
}
