pub mod capital;
pub mod grouped;
pub mod limits;
pub mod stats;

pub use capital::{compute_capital_stats, CapitalStats, EquityPoint};
pub use grouped::{grouped_stats, GroupDimension, GroupStats, DIMENSIONS};
pub use limits::{check_loss_limits, LossLimitStatus};
pub use stats::{global_stats, TradeStats};

use crate::models::{Outcome, Trade};

/// Trades matching `keep`, oldest entry first. Equal timestamps keep their
/// input order.
pub(crate) fn chronological<'a, F>(trades: &'a [Trade], keep: F) -> Vec<&'a Trade>
where
    F: Fn(&Trade) -> bool,
{
    let mut out: Vec<&Trade> = trades.iter().filter(|t| keep(t)).collect();
    out.sort_by_key(|t| t.date);
    out
}

/// Consecutive win/loss runs. Break-even trades end both runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Streaks {
    pub max_win: usize,
    pub max_loss: usize,
    /// Positive for a running win streak, negative for losses.
    pub current: i64,
}

impl Streaks {
    pub fn scan<'a, I>(trades: I) -> Self
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        let mut s = Streaks::default();
        let (mut wins, mut losses) = (0usize, 0usize);
        for t in trades {
            match t.outcome {
                Outcome::Win => {
                    wins += 1;
                    losses = 0;
                }
                Outcome::Loss => {
                    losses += 1;
                    wins = 0;
                }
                _ => {
                    wins = 0;
                    losses = 0;
                }
            }
            s.max_win = s.max_win.max(wins);
            s.max_loss = s.max_loss.max(losses);
        }
        s.current = if wins > 0 {
            wins as i64
        } else {
            -(losses as i64)
        };
        s
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
