use serde::{Deserialize, Serialize};

use crate::analytics::{chronological, mean, Streaks};
use crate::models::{Outcome, Trade};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeStats {
    // Counts
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub open_trades: usize,
    pub missed_trades: usize,

    // Performance
    pub win_rate: f64,
    pub gross_pnl: f64,
    pub gross_win: f64,
    pub gross_loss: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_r: f64,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub best_trade: f64,
    pub worst_trade: f64,

    // Risk
    pub max_drawdown: f64,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
}

impl TradeStats {
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(50));
        println!("  JOURNAL STATS");
        println!("{}", "=".repeat(50));
        println!("  Closed:      {}", self.total_trades);
        println!(
            "  W/L/BE:      {} / {} / {}",
            self.wins, self.losses, self.breakevens
        );
        println!("  Open:        {}", self.open_trades);
        println!("  Missed:      {}", self.missed_trades);
        println!("  Win Rate:    {:.1}%", self.win_rate);
        println!();
        println!("  Gross PnL:   ${:+.2}", self.gross_pnl);
        println!("  Avg Win:     ${:.2}", self.avg_win);
        println!("  Avg Loss:    ${:.2}", self.avg_loss);
        println!("  Best:        ${:+.2}", self.best_trade);
        println!("  Worst:       ${:+.2}", self.worst_trade);
        println!("  Expectancy:  ${:+.2}", self.expectancy);
        println!("  Avg R:       {:+.2}", self.avg_r);
        println!("  Profit Factor: {:.2}", self.profit_factor);
        println!();
        println!("  Max DD:      ${:.2}", self.max_drawdown);
        println!(
            "  Streaks:     {} wins / {} losses",
            self.max_win_streak, self.max_loss_streak
        );
        println!("{}", "=".repeat(50));
    }
}

/// Headline statistics over closed trades (Win, Loss, BreakEven).
///
/// Profit factor is `gross_win / gross_loss`, falling back to `gross_win`
/// when there are no losing dollars. Drawdown is measured on cumulative
/// PnL, starting from a peak of 0.
pub fn global_stats(trades: &[Trade]) -> TradeStats {
    let closed = chronological(trades, |t| t.outcome.is_closed());
    let open_trades = trades.iter().filter(|t| t.outcome == Outcome::Open).count();
    let missed_trades = trades.iter().filter(|t| t.outcome == Outcome::Missed).count();

    let total_trades = closed.len();
    if total_trades == 0 {
        return TradeStats {
            open_trades,
            missed_trades,
            ..TradeStats::default()
        };
    }

    let wins: Vec<f64> = closed
        .iter()
        .filter(|t| t.outcome == Outcome::Win)
        .map(|t| t.pnl)
        .collect();
    let losses: Vec<f64> = closed
        .iter()
        .filter(|t| t.outcome == Outcome::Loss)
        .map(|t| t.pnl.abs())
        .collect();
    let breakevens = total_trades - wins.len() - losses.len();

    let gross_pnl: f64 = closed.iter().map(|t| t.pnl).sum();
    let gross_win: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum();

    let win_fraction = wins.len() as f64 / total_trades as f64;
    let avg_win = mean(&wins);
    let avg_loss = mean(&losses);
    let expectancy = avg_win * win_fraction - avg_loss * (1.0 - win_fraction);

    let profit_factor = if gross_loss > 0.0 {
        gross_win / gross_loss
    } else {
        gross_win
    };

    let r_values: Vec<f64> = closed.iter().map(|t| t.r_multiple).collect();

    let best_trade = closed.iter().map(|t| t.pnl).fold(f64::NEG_INFINITY, f64::max);
    let worst_trade = closed.iter().map(|t| t.pnl).fold(f64::INFINITY, f64::min);

    // Peak-to-trough on the running PnL total
    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;
    let mut max_drawdown = 0.0_f64;
    for t in &closed {
        cumulative += t.pnl;
        peak = peak.max(cumulative);
        max_drawdown = max_drawdown.max(peak - cumulative);
    }

    let streaks = Streaks::scan(closed.iter().copied());

    TradeStats {
        total_trades,
        wins: wins.len(),
        losses: losses.len(),
        breakevens,
        open_trades,
        missed_trades,
        win_rate: win_fraction * 100.0,
        gross_pnl,
        gross_win,
        gross_loss,
        avg_win,
        avg_loss,
        avg_r: mean(&r_values),
        profit_factor,
        expectancy,
        best_trade,
        worst_trade,
        max_drawdown,
        max_win_streak: streaks.max_win,
        max_loss_streak: streaks.max_loss,
    }
}
