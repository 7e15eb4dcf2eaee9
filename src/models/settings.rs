use serde::{Deserialize, Serialize};

use crate::models::RiskMode;

pub const DEFAULT_STARTING_BALANCE: f64 = 10_000.0;
pub const DEFAULT_DRAWDOWN_ALERT_PCT: f64 = 10.0;
pub const DEFAULT_RISK_PCT: f64 = 1.0;

/// Balance used for equity projection. Singleton per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalSettings {
    /// Account balance before the first journaled trade.
    pub starting_balance: f64,
    /// Current drawdown (percent of peak equity) that raises the alert flag.
    pub drawdown_alert_pct: f64,
}

impl Default for CapitalSettings {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            drawdown_alert_pct: DEFAULT_DRAWDOWN_ALERT_PCT,
        }
    }
}

/// Per-user risk preferences. Singleton per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Pre-filled risk for new calculations, in percent of balance.
    pub default_risk_pct: f64,
    pub default_risk_mode: RiskMode,
    /// Realized loss (dollars, positive number) allowed per local day.
    #[serde(default)]
    pub max_daily_loss: Option<f64>,
    /// Realized loss (dollars, positive number) allowed per ISO week.
    #[serde(default)]
    pub max_weekly_loss: Option<f64>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_risk_pct: DEFAULT_RISK_PCT,
            default_risk_mode: RiskMode::Percent,
            max_daily_loss: None,
            max_weekly_loss: None,
        }
    }
}
