use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use trade_journal::ai::{build_report_request, generate_report, HttpReportGenerator, ReportGenerator};
use trade_journal::analytics::{GroupDimension, DIMENSIONS};
use trade_journal::config::Config;
use trade_journal::core::sizing::calculate_position;
use trade_journal::export;
use trade_journal::journal::Journal;
use trade_journal::models::{RiskMode, SizingInput, SizingTarget};
use trade_journal::store::SqliteStore;

const USAGE: &str = "\
usage: trade-journal <command>

  stats <user>
  groups <user> <dimension>
  capital <user>
  limits <user>
  redetect <user>
  size <balance> <risk%> <entry> <stop>
  export-trades <user> <path>
  export-calculations <user> <path>
  report <user>";

fn arg<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing <{}>\n\n{}", name, USAGE))
}

fn num(args: &[String], i: usize, name: &str) -> Result<f64> {
    arg(args, i, name)?
        .parse()
        .with_context(|| format!("<{}> must be a number", name))
}

fn open_journal(cfg: &Config, user: &str) -> Result<Journal> {
    let store = SqliteStore::open(&cfg.db_path)
        .with_context(|| format!("opening journal at {}", cfg.db_path))?;
    Ok(Journal::new(Arc::new(store), cfg.clone(), Some(user.to_string())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        println!("{}", USAGE);
        return Ok(());
    };

    match command.as_str() {
        "stats" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            journal.stats()?.print_summary();
        }
        "groups" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            let raw = arg(&args, 3, "dimension")?;
            let dimension = GroupDimension::from_str_loose(raw).ok_or_else(|| {
                let names: Vec<&str> = DIMENSIONS.iter().map(|d| d.as_str()).collect();
                anyhow!("unknown dimension '{}', expected one of: {}", raw, names.join(", "))
            })?;

            println!("\n  BY {}", dimension.as_str().to_uppercase());
            println!("  ───────────────────────────────────────────────");
            for g in journal.grouped(dimension)? {
                println!(
                    "  {:<20} {:>4} trades | WR {:>5.1}% | PnL ${:>+10.2} | R {:+.2}",
                    g.name, g.total_trades, g.win_rate, g.net_pnl, g.avg_r
                );
            }
        }
        "capital" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            journal.capital()?.print_summary();
        }
        "limits" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            let status = journal.loss_limits()?;
            let limit = |l: Option<f64>| l.map(|v| format!("${:.2}", v)).unwrap_or_else(|| "none".into());
            println!(
                "  Today:  ${:+.2} (limit {}){}",
                status.daily_pnl,
                limit(status.daily_limit),
                if status.daily_breached { "  BREACHED" } else { "" }
            );
            println!(
                "  Week:   ${:+.2} (limit {}){}",
                status.weekly_pnl,
                limit(status.weekly_limit),
                if status.weekly_breached { "  BREACHED" } else { "" }
            );
        }
        "redetect" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            let changed = journal.redetect_mistakes()?;
            println!("  {} trades re-tagged", changed);
        }
        "size" => {
            let input = SizingInput {
                balance: num(&args, 2, "balance")?,
                risk_mode: RiskMode::Percent,
                risk_value: num(&args, 3, "risk%")?,
                target: SizingTarget::Units {
                    entry: num(&args, 4, "entry")?,
                    stop: num(&args, 5, "stop")?,
                },
            };
            let result = calculate_position(&input);
            if !result.valid {
                bail!("inputs do not produce a position");
            }
            println!("  Size:        {:.6}", result.position_size);
            println!("  Notional:    ${:.2}", result.position_value);
            println!("  Risk:        ${:.2}", result.dollar_risk);
        }
        "export-trades" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            let path = arg(&args, 3, "path")?;
            export::export_trades(Path::new(path), &journal.trades()?)?;
        }
        "export-calculations" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            let path = arg(&args, 3, "path")?;
            export::export_calculations(Path::new(path), &journal.calculations()?)?;
        }
        "report" => {
            let journal = open_journal(&cfg, arg(&args, 2, "user")?)?;
            let trades = journal.trades()?;
            let stats = journal.stats()?;
            let request = build_report_request(&trades, &stats, cfg.report_trade_limit);

            let generator = HttpReportGenerator::from_config(&cfg)?;
            let text = generate_report(
                generator.as_ref().map(|g| g as &dyn ReportGenerator),
                &request,
            )
            .await;
            println!("{}", text);
        }
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }

    Ok(())
}
