use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Direction, Outcome, RiskMode};

fn default_true() -> bool {
    true
}

/// Raw trade input as captured by the journal form. Every computed field is
/// derived from this by `core::metrics::derive_trade`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDraft {
    pub date: DateTime<Utc>,
    pub pair: String,
    pub direction: Direction,
    #[serde(default)]
    pub entry_price: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub exit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub position_size: f64,
    #[serde(default)]
    pub risk_amount: f64,
    #[serde(default)]
    pub risk_mode: RiskMode,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub media_links: Vec<String>,
    #[serde(default)]
    pub setups: Vec<String>,
    #[serde(default)]
    pub timeframes: Vec<String>,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub entry_emotion: Option<String>,
    #[serde(default)]
    pub exit_emotion: Option<String>,
    #[serde(default)]
    pub mistakes: Vec<String>,
    /// When set, pnl is taken as given instead of computed from prices.
    #[serde(default)]
    pub manual_pnl: Option<f64>,
    #[serde(default)]
    pub manual_outcome: Option<Outcome>,
    #[serde(default = "default_true")]
    pub affects_capital: bool,
    #[serde(default)]
    pub is_missed: bool,
    #[serde(default)]
    pub skip_reason: Option<String>,
    #[serde(default)]
    pub news_affected: bool,
}

impl TradeDraft {
    pub fn new(pair: &str, direction: Direction, date: DateTime<Utc>) -> Self {
        Self {
            date,
            pair: pair.to_string(),
            direction,
            entry_price: 0.0,
            stop_loss: None,
            take_profit: None,
            exit_price: None,
            exit_date: None,
            position_size: 0.0,
            risk_amount: 0.0,
            risk_mode: RiskMode::Percent,
            reason: String::new(),
            notes: String::new(),
            media_links: Vec::new(),
            setups: Vec::new(),
            timeframes: Vec::new(),
            emotions: Vec::new(),
            entry_emotion: None,
            exit_emotion: None,
            mistakes: Vec::new(),
            manual_pnl: None,
            manual_outcome: None,
            affects_capital: true,
            is_missed: false,
            skip_reason: None,
            news_affected: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub pair: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub exit_price: Option<f64>,
    pub exit_date: Option<DateTime<Utc>>,
    pub position_size: f64,
    pub risk_amount: f64,
    pub risk_mode: RiskMode,
    pub reason: String,
    pub notes: String,
    pub media_links: Vec<String>,
    pub setups: Vec<String>,
    pub timeframes: Vec<String>,
    pub emotions: Vec<String>,
    pub entry_emotion: Option<String>,
    pub exit_emotion: Option<String>,
    pub mistakes: Vec<String>,

    // Computed
    pub pnl: f64,
    pub r_multiple: f64,
    pub outcome: Outcome,
    pub duration_minutes: Option<i64>,
    pub is_manual_pnl: bool,

    pub affects_capital: bool,
    pub is_missed: bool,
    pub skip_reason: Option<String>,
    pub news_affected: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    /// Stop-loss with the "0 means no stop" convention applied.
    pub fn stop(&self) -> Option<f64> {
        self.stop_loss.filter(|s| *s != 0.0)
    }

    /// Convert back into an editable draft, keeping a manual pnl override.
    pub fn to_draft(&self) -> TradeDraft {
        TradeDraft {
            date: self.date,
            pair: self.pair.clone(),
            direction: self.direction,
            entry_price: self.entry_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            exit_price: self.exit_price,
            exit_date: self.exit_date,
            position_size: self.position_size,
            risk_amount: self.risk_amount,
            risk_mode: self.risk_mode,
            reason: self.reason.clone(),
            notes: self.notes.clone(),
            media_links: self.media_links.clone(),
            setups: self.setups.clone(),
            timeframes: self.timeframes.clone(),
            emotions: self.emotions.clone(),
            entry_emotion: self.entry_emotion.clone(),
            exit_emotion: self.exit_emotion.clone(),
            mistakes: self.mistakes.clone(),
            manual_pnl: self.is_manual_pnl.then_some(self.pnl),
            manual_outcome: self.is_manual_pnl.then_some(self.outcome),
            affects_capital: self.affects_capital,
            is_missed: self.is_missed,
            skip_reason: self.skip_reason.clone(),
            news_affected: self.news_affected,
        }
    }
}

/// Immutable before/after record written on every trade update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeHistoryEntry {
    pub trade_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub before: Trade,
    pub after: Trade,
}
