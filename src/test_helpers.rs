use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::core::metrics::{classify_outcome, derive_trade};
use crate::models::{Direction, Outcome, Trade, TradeDraft};

/// Monday 2024-01-15 09:00 UTC, the anchor for generated trades.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

/// A priced trade run through the real derivation.
pub fn closed_trade(
    id: &str,
    direction: Direction,
    entry: f64,
    exit: f64,
    stop: f64,
    size: f64,
) -> Trade {
    let mut draft = TradeDraft::new("BTCUSD", direction, base_time());
    draft.entry_price = entry;
    draft.exit_price = Some(exit);
    draft.stop_loss = Some(stop);
    draft.position_size = size;
    derive_trade(draft, id, "user-1", base_time(), base_time()).unwrap()
}

/// A clean winning long (stop set, no target) entered at `date`.
pub fn trade_at(id: &str, date: DateTime<Utc>) -> Trade {
    let mut t = closed_trade(id, Direction::Long, 100.0, 110.0, 95.0, 1.0);
    t.date = date;
    t
}

/// A trade with a fixed pnl and r, entered `hours` after the base time.
pub fn pnl_trade(id: &str, hours: i64, pnl: f64, r: f64) -> Trade {
    let mut t = trade_at(id, base_time() + Duration::hours(hours));
    t.pnl = pnl;
    t.r_multiple = r;
    t.outcome = classify_outcome(pnl);
    t.is_manual_pnl = true;
    t
}

pub fn pnl_trade_on(id: &str, date: DateTime<Utc>, pnl: f64) -> Trade {
    let mut t = pnl_trade(id, 0, pnl, pnl.signum());
    t.date = date;
    t.exit_date = Some(date);
    t
}

pub fn open_trade(id: &str, hours: i64) -> Trade {
    let mut t = trade_at(id, base_time() + Duration::hours(hours));
    t.exit_price = None;
    t.pnl = 0.0;
    t.r_multiple = 0.0;
    t.outcome = Outcome::Open;
    t
}
