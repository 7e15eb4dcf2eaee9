#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use trade_journal::config::Config;
use trade_journal::journal::Journal;
use trade_journal::models::{Direction, TradeDraft};
use trade_journal::store::JournalStore;

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Journal for `user` with the clock pinned to `base_time()`.
pub fn journal_for(store: Arc<dyn JournalStore>, user: Option<&str>) -> Journal {
    let mut journal = Journal::new(store, Config::default(), user.map(str::to_string));
    journal.sim_time = Some(base_time());
    journal
}

/// A fully priced draft entered `minutes` after the base time.
pub fn draft(
    direction: Direction,
    entry: f64,
    exit: f64,
    stop: f64,
    size: f64,
    minutes: i64,
) -> TradeDraft {
    let date = base_time() + Duration::minutes(minutes);
    let mut d = TradeDraft::new("BTCUSD", direction, date);
    d.entry_price = entry;
    d.exit_price = Some(exit);
    d.exit_date = Some(date + Duration::minutes(30));
    d.stop_loss = Some(stop);
    d.position_size = size;
    d
}

/// A long that wins 1R with a clean 2R target.
pub fn clean_win(minutes: i64) -> TradeDraft {
    let mut d = draft(Direction::Long, 100.0, 105.0, 95.0, 1.0, minutes);
    d.take_profit = Some(110.0);
    d
}
