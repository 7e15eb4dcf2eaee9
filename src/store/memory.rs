use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::models::{CalculatorEntry, CapitalSettings, Trade, TradeHistoryEntry, UserSettings};
use crate::store::JournalStore;

#[derive(Default)]
struct MemoryState {
    trades: HashMap<String, Vec<Trade>>,
    history: HashMap<String, Vec<TradeHistoryEntry>>,
    capital: HashMap<String, CapitalSettings>,
    settings: HashMap<String, UserSettings>,
    calculations: HashMap<String, VecDeque<CalculatorEntry>>,
}

/// Process-local store, used by tests and as the default for embedding.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JournalStore for MemoryStore {
    fn load_trades(&self, user_id: &str) -> Result<Vec<Trade>, StoreError> {
        let state = self.state.lock()?;
        let mut trades = state.trades.get(user_id).cloned().unwrap_or_default();
        trades.sort_by_key(|t| t.date);
        Ok(trades)
    }

    fn get_trade(&self, user_id: &str, id: &str) -> Result<Option<Trade>, StoreError> {
        let state = self.state.lock()?;
        Ok(state
            .trades
            .get(user_id)
            .and_then(|ts| ts.iter().find(|t| t.id == id))
            .cloned())
    }

    fn upsert_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        let mut state = self.state.lock()?;
        let trades = state.trades.entry(trade.user_id.clone()).or_default();
        match trades.iter_mut().find(|t| t.id == trade.id) {
            Some(existing) => *existing = trade.clone(),
            None => trades.push(trade.clone()),
        }
        Ok(())
    }

    fn delete_trade(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock()?;
        let Some(trades) = state.trades.get_mut(user_id) else {
            return Ok(false);
        };
        let before = trades.len();
        trades.retain(|t| t.id != id);
        Ok(trades.len() != before)
    }

    fn append_history(&self, entry: &TradeHistoryEntry) -> Result<(), StoreError> {
        let mut state = self.state.lock()?;
        state
            .history
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn load_history(&self, user_id: &str, trade_id: &str) -> Result<Vec<TradeHistoryEntry>, StoreError> {
        let state = self.state.lock()?;
        Ok(state
            .history
            .get(user_id)
            .map(|h| h.iter().filter(|e| e.trade_id == trade_id).cloned().collect())
            .unwrap_or_default())
    }

    fn load_capital_settings(&self, user_id: &str) -> Result<Option<CapitalSettings>, StoreError> {
        Ok(self.state.lock()?.capital.get(user_id).cloned())
    }

    fn save_capital_settings(&self, user_id: &str, settings: &CapitalSettings) -> Result<(), StoreError> {
        self.state
            .lock()?
            .capital
            .insert(user_id.to_string(), settings.clone());
        Ok(())
    }

    fn load_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        Ok(self.state.lock()?.settings.get(user_id).cloned())
    }

    fn save_user_settings(&self, user_id: &str, settings: &UserSettings) -> Result<(), StoreError> {
        self.state
            .lock()?
            .settings
            .insert(user_id.to_string(), settings.clone());
        Ok(())
    }

    fn append_calculation(&self, user_id: &str, entry: &CalculatorEntry, cap: usize) -> Result<(), StoreError> {
        let mut state = self.state.lock()?;
        let list = state.calculations.entry(user_id.to_string()).or_default();
        list.push_back(entry.clone());
        while list.len() > cap {
            list.pop_front();
        }
        Ok(())
    }

    fn load_calculations(&self, user_id: &str) -> Result<Vec<CalculatorEntry>, StoreError> {
        let state = self.state.lock()?;
        Ok(state
            .calculations
            .get(user_id)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::pnl_trade;

    #[test]
    fn upsert_replaces_and_partitions_by_user() {
        let store = MemoryStore::new();
        let mut t = pnl_trade("a", 0, 10.0, 1.0);
        store.upsert_trade(&t).unwrap();
        t.pnl = 20.0;
        store.upsert_trade(&t).unwrap();

        let trades = store.load_trades("user-1").unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].pnl, 20.0);
        assert!(store.load_trades("someone-else").unwrap().is_empty());
        assert!(store.get_trade("someone-else", "a").unwrap().is_none());
    }

    #[test]
    fn delete_reports_whether_removed() {
        let store = MemoryStore::new();
        store.upsert_trade(&pnl_trade("a", 0, 10.0, 1.0)).unwrap();
        assert!(!store.delete_trade("someone-else", "a").unwrap());
        assert!(store.delete_trade("user-1", "a").unwrap());
        assert!(!store.delete_trade("user-1", "a").unwrap());
    }
}
