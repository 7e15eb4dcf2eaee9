pub mod calculator;
pub mod direction;
pub mod settings;
pub mod trade;

pub use calculator::*;
pub use direction::*;
pub use settings::*;
pub use trade::{Trade, TradeDraft, TradeHistoryEntry};
