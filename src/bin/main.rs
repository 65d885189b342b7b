#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "ProofLedger CLI".bright_cyan().bold());
    println!("{}", "---------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but the functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}", "proofledger-append".bright_white());
    println!("  - {}", "proofledger-history".bright_white());
    println!("  - {}", "proofledger-verify".bright_white());
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!(
        "{}",
        "  cargo run --bin proofledger-append -- \"hello ledger\"".italic()
    );
}
