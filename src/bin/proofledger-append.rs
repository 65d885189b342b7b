#![forbid(unsafe_code)]
//! Mine a new block carrying the given payload and append it to the ledger.

use colored::*;
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use proofledger::cli::open_ledger_from_config;
use proofledger::error::LedgerError;
use proofledger::pow::{Progress, ProofOfWork};
use std::env;
use std::time::Instant;

/// Retries after losing the head compare-and-swap race.
const MAX_ATTEMPTS: u32 = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <payload>", args[0]);
        return Ok(());
    }
    let payload = args[1..].join(" ");

    let (config, ledger) = open_ledger_from_config()?;

    println!();
    println!(
        "{}",
        "⛏️  Mining new block...".bright_cyan().bold()
    );
    println!();

    let start_time = Instant::now();
    let mut attempt = 0;
    let block = loop {
        attempt += 1;

        let mut pow = ProofOfWork::new();
        let mut display_thread = None;
        if config.miner.show_progress {
            let (tx, rx) = bounded::<Progress>(64);
            pow = pow.with_progress(tx, config.miner.progress_interval);

            let bar = ProgressBar::new_spinner();
            bar.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
            display_thread = Some(std::thread::spawn(move || {
                for report in rx.iter() {
                    bar.set_message(format!("{} hashes tried", report.attempts));
                    bar.tick();
                }
                bar.finish_and_clear();
            }));
        }

        let result = ledger.append_with(payload.as_bytes(), &pow);

        // Dropping the proof-of-work closes the progress channel, which ends
        // the display thread.
        drop(pow);
        if let Some(handle) = display_thread {
            let _ = handle.join();
        }

        match result {
            Ok(block) => break block,
            Err(LedgerError::StaleHead(msg)) if attempt < MAX_ATTEMPTS => {
                println!(
                    "{}",
                    format!("Head moved ({}); mining against the new head...", msg).yellow()
                );
            }
            Err(e) => return Err(e.into()),
        }
    };
    let elapsed = start_time.elapsed();

    println!("{}", "╔══════════════════════════════════════╗".bright_green());
    println!(
        "{}",
        "║           ✅ BLOCK ADMITTED          ║".bright_green().bold()
    );
    println!("{}", "╚══════════════════════════════════════╝".bright_green());
    println!();
    println!("  {}  {}", "Hash:".bright_white(), block.hash_hex());
    println!("  {}  {}", "Prev:".bright_white(), block.prev_hash_hex());
    println!("  {} {}", "Nonce:".bright_white(), block.nonce);
    println!(
        "  {} {} bytes",
        "Payload:".bright_white(),
        block.payload.len()
    );
    println!(
        "  {} {:.3} seconds",
        "Mining time:".bright_white(),
        elapsed.as_secs_f64()
    );
    println!();

    Ok(())
}
