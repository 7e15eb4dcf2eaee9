use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{CalculatorEntry, CapitalSettings, Trade, TradeHistoryEntry, UserSettings};
use crate::store::JournalStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trades (
    id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    trade_date INTEGER NOT NULL,
    payload TEXT NOT NULL,
    PRIMARY KEY (user_id, id)
);
CREATE INDEX IF NOT EXISTS idx_trades_user_date ON trades (user_id, trade_date);

CREATE TABLE IF NOT EXISTS trade_history (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    trade_id TEXT NOT NULL,
    recorded_at INTEGER NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_trade ON trade_history (user_id, trade_id);

CREATE TABLE IF NOT EXISTS settings (
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    PRIMARY KEY (user_id, kind)
);

CREATE TABLE IF NOT EXISTS calculations (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    id TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_calculations_user ON calculations (user_id, seq);
";

const CAPITAL_KIND: &str = "capital";
const USER_KIND: &str = "user";

/// SQLite-backed store. Records are kept as JSON payloads next to the
/// columns used for scoping and ordering.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        info!("Journal database: {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_setting<T: DeserializeOwned>(&self, user_id: &str, kind: &str) -> Result<Option<T>, StoreError> {
        let conn = self.conn.lock()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM settings WHERE user_id = ?1 AND kind = ?2",
                params![user_id, kind],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save_setting<T: Serialize>(&self, user_id: &str, kind: &str, value: &T) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value)?;
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO settings (user_id, kind, payload) VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, kind) DO UPDATE SET payload = excluded.payload",
            params![user_id, kind, payload],
        )?;
        Ok(())
    }
}

fn decode_all<T: DeserializeOwned>(payloads: Vec<String>) -> Result<Vec<T>, StoreError> {
    payloads
        .iter()
        .map(|p| serde_json::from_str(p).map_err(StoreError::from))
        .collect()
}

impl JournalStore for SqliteStore {
    fn load_trades(&self, user_id: &str) -> Result<Vec<Trade>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM trades WHERE user_id = ?1 ORDER BY trade_date ASC, rowid ASC",
        )?;
        let payloads = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_all(payloads)
    }

    fn get_trade(&self, user_id: &str, id: &str) -> Result<Option<Trade>, StoreError> {
        let conn = self.conn.lock()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM trades WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p))
            .transpose()
            .map_err(StoreError::from)
    }

    fn upsert_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        let payload = serde_json::to_string(trade)?;
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO trades (id, user_id, trade_date, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, id) DO UPDATE SET
                trade_date = excluded.trade_date,
                payload = excluded.payload",
            params![
                trade.id,
                trade.user_id,
                trade.date.timestamp_millis(),
                payload
            ],
        )?;
        debug!("Upserted trade {} for {}", trade.id, trade.user_id);
        Ok(())
    }

    fn delete_trade(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock()?;
        let removed = conn.execute(
            "DELETE FROM trades WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(removed > 0)
    }

    fn append_history(&self, entry: &TradeHistoryEntry) -> Result<(), StoreError> {
        let payload = serde_json::to_string(entry)?;
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO trade_history (user_id, trade_id, recorded_at, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.user_id,
                entry.trade_id,
                entry.timestamp.timestamp_millis(),
                payload
            ],
        )?;
        Ok(())
    }

    fn load_history(&self, user_id: &str, trade_id: &str) -> Result<Vec<TradeHistoryEntry>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM trade_history WHERE user_id = ?1 AND trade_id = ?2 ORDER BY seq ASC",
        )?;
        let payloads = stmt
            .query_map(params![user_id, trade_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_all(payloads)
    }

    fn load_capital_settings(&self, user_id: &str) -> Result<Option<CapitalSettings>, StoreError> {
        self.load_setting(user_id, CAPITAL_KIND)
    }

    fn save_capital_settings(&self, user_id: &str, settings: &CapitalSettings) -> Result<(), StoreError> {
        self.save_setting(user_id, CAPITAL_KIND, settings)
    }

    fn load_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        self.load_setting(user_id, USER_KIND)
    }

    fn save_user_settings(&self, user_id: &str, settings: &UserSettings) -> Result<(), StoreError> {
        self.save_setting(user_id, USER_KIND, settings)
    }

    fn append_calculation(&self, user_id: &str, entry: &CalculatorEntry, cap: usize) -> Result<(), StoreError> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO calculations (user_id, id, created_at, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                entry.id,
                entry.created_at.timestamp_millis(),
                payload
            ],
        )?;
        let evicted = tx.execute(
            "DELETE FROM calculations WHERE user_id = ?1 AND seq NOT IN (
                SELECT seq FROM calculations WHERE user_id = ?1 ORDER BY seq DESC LIMIT ?2
             )",
            params![user_id, cap as i64],
        )?;
        tx.commit()?;
        if evicted > 0 {
            debug!("Evicted {} old calculations for {}", evicted, user_id);
        }
        Ok(())
    }

    fn load_calculations(&self, user_id: &str) -> Result<Vec<CalculatorEntry>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT payload FROM calculations WHERE user_id = ?1 ORDER BY seq ASC")?;
        let payloads = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_all(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskMode, SizingInput, SizingResult, SizingTarget};
    use crate::test_helpers::{base_time, pnl_trade};
    use chrono::Duration;

    fn calc(i: i64) -> CalculatorEntry {
        CalculatorEntry {
            id: format!("c{}", i),
            // Dates run backwards so eviction cannot be following them
            created_at: base_time() - Duration::days(i),
            pair: None,
            note: None,
            input: SizingInput {
                balance: 1000.0,
                risk_mode: RiskMode::Percent,
                risk_value: 1.0,
                target: SizingTarget::Units {
                    entry: 10.0,
                    stop: 9.0,
                },
            },
            result: SizingResult::default(),
        }
    }

    #[test]
    fn trades_round_trip_in_entry_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_trade(&pnl_trade("late", 5, 10.0, 1.0)).unwrap();
        store.upsert_trade(&pnl_trade("early", 1, -5.0, -0.5)).unwrap();

        let trades = store.load_trades("user-1").unwrap();
        let ids: Vec<&str> = trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(trades[1], pnl_trade("late", 5, 10.0, 1.0));

        assert!(store.delete_trade("user-1", "early").unwrap());
        assert!(store.get_trade("user-1", "early").unwrap().is_none());
    }

    #[test]
    fn calculation_history_is_capped_fifo() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..60 {
            store.append_calculation("user-1", &calc(i), 50).unwrap();
        }
        store.append_calculation("user-2", &calc(99), 50).unwrap();

        let saved = store.load_calculations("user-1").unwrap();
        assert_eq!(saved.len(), 50);
        assert_eq!(saved[0].id, "c10");
        assert_eq!(saved[49].id, "c59");
        assert_eq!(store.load_calculations("user-2").unwrap().len(), 1);
    }

    #[test]
    fn settings_are_last_write_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load_capital_settings("user-1").unwrap().is_none());

        let mut s = CapitalSettings::default();
        store.save_capital_settings("user-1", &s).unwrap();
        s.starting_balance = 2500.0;
        store.save_capital_settings("user-1", &s).unwrap();
        assert_eq!(store.load_capital_settings("user-1").unwrap(), Some(s));

        let u = UserSettings {
            max_daily_loss: Some(200.0),
            ..UserSettings::default()
        };
        store.save_user_settings("user-1", &u).unwrap();
        assert_eq!(store.load_user_settings("user-1").unwrap(), Some(u));
    }

    #[test]
    fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("journal.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_trade(&pnl_trade("a", 0, 10.0, 1.0)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_trades("user-1").unwrap().len(), 1);
    }

    #[test]
    fn unusable_parent_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = SqliteStore::open(blocker.join("sub").join("journal.db"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
