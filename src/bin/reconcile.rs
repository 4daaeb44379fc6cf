use std::path::PathBuf;

use anyhow::{Context, Result};

use matchday_ledger::aliases::AliasTables;
use matchday_ledger::config::{LedgerConfig, ResolverConfig, env_bool};
use matchday_ledger::logging;
use matchday_ledger::odds::OddsResolver;
use matchday_ledger::reconcile::ReconciliationEngine;
use matchday_ledger::results_fetch::FotmobResults;
use matchday_ledger::stats::{self, StatsFilter};
use matchday_ledger::store::PredictionStore;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let config = LedgerConfig::from_env();
    let db_path = parse_db_path_arg()
        .or(config.db_path.clone())
        .context("unable to resolve sqlite path")?;
    let tables = AliasTables::load_or_bundled(config.alias_tables_path.as_deref())?;

    let mut store = PredictionStore::open(&db_path)?;
    let summary = ReconciliationEngine::new(&mut store, FotmobResults).reconcile_all();

    println!("Reconciliation complete");
    println!("DB: {}", db_path.display());
    println!(
        "Pending scanned: {} across {} matches",
        summary.scanned, summary.matches
    );
    println!("Completed: {}", summary.completed);
    println!("Still pending: {}", summary.still_pending);
    println!("No result data: {}", summary.missing);
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    if env_bool("RECONCILE_PRINT_STATS", true) {
        let s = stats::compute(&store, &StatsFilter::all(), config.stake_basis)?;
        println!();
        println!("Predictions: {} ({} pending)", s.total, s.pending_count);
        println!("Correct: {}/{}", s.correct, s.completed);
        println!("Success rate: {:.1}%", s.success_rate);
        println!("Total profit: {:.2}", s.total_profit);
        println!("ROI ({:?}): {:.1}%", config.stake_basis, s.roi);

        let odds = OddsResolver::load(&store, &tables, ResolverConfig::from_env().thresholds)?;
        if !odds.is_empty() {
            println!(
                "Odds rows: {} across {} leagues",
                odds.len(),
                odds.leagues_with_odds().len()
            );
        }
    }

    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
