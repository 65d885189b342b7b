#![forbid(unsafe_code)]
//! Re-check the proof of work and hash consistency of every block.

use colored::*;
use proofledger::cli::open_ledger_from_config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (_config, ledger) = open_ledger_from_config()?;

    println!();
    println!("{}", "🔍 Verifying ledger integrity...".bright_cyan().bold());
    println!();

    match ledger.verify_chain() {
        Ok(count) => {
            println!(
                "{}",
                format!("✅ Chain intact: {} blocks verified, head to genesis.", count)
                    .bright_green()
                    .bold()
            );
            println!("{}", format!("🔗 Head: {}", hex::encode(ledger.head())).green());
            println!();
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{}",
                format!("❌ Integrity check failed: {}", e).bright_red().bold()
            );
            eprintln!();
            Err(e.into())
        }
    }
}
