pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::models::{CalculatorEntry, CapitalSettings, Trade, TradeHistoryEntry, UserSettings};

/// Persistence port for the journal. Every call is scoped to one user;
/// writes are last-write-wins.
pub trait JournalStore: Send + Sync {
    /// All trades of a user, oldest entry first. Equal entry times come
    /// back in insertion order; updates keep a trade's place.
    fn load_trades(&self, user_id: &str) -> Result<Vec<Trade>, StoreError>;
    fn get_trade(&self, user_id: &str, id: &str) -> Result<Option<Trade>, StoreError>;
    fn upsert_trade(&self, trade: &Trade) -> Result<(), StoreError>;
    /// Returns whether a trade was removed.
    fn delete_trade(&self, user_id: &str, id: &str) -> Result<bool, StoreError>;

    fn append_history(&self, entry: &TradeHistoryEntry) -> Result<(), StoreError>;
    /// Audit records of one trade in the order they were written.
    fn load_history(&self, user_id: &str, trade_id: &str) -> Result<Vec<TradeHistoryEntry>, StoreError>;

    fn load_capital_settings(&self, user_id: &str) -> Result<Option<CapitalSettings>, StoreError>;
    fn save_capital_settings(&self, user_id: &str, settings: &CapitalSettings) -> Result<(), StoreError>;
    fn load_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError>;
    fn save_user_settings(&self, user_id: &str, settings: &UserSettings) -> Result<(), StoreError>;

    /// Append a saved calculation, then drop the oldest inserted entries so
    /// at most `cap` remain.
    fn append_calculation(&self, user_id: &str, entry: &CalculatorEntry, cap: usize) -> Result<(), StoreError>;
    /// Saved calculations, oldest inserted first.
    fn load_calculations(&self, user_id: &str) -> Result<Vec<CalculatorEntry>, StoreError>;
}
