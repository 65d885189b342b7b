#![forbid(unsafe_code)]
//! Walk the ledger from the newest block back to genesis and print it.

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use proofledger::block::Block;
use proofledger::cli::{open_ledger_from_config, short_hash};
use proofledger::error::Result;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (_config, ledger) = open_ledger_from_config()?;

    println!();
    println!(
        "{}",
        "📜 LEDGER HISTORY (newest first)".bright_cyan().bold()
    );
    println!();

    let blocks: Vec<Block> = ledger.iter().collect::<Result<_>>()?;
    let total = blocks.len();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Height")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Hash")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Prev")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Nonce")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Payload")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
        ]);

    for (idx, block) in blocks.iter().enumerate() {
        let height = total - 1 - idx;
        let payload_text = payload_preview(&block.payload);
        let (kind_color, prev_text) = if block.is_genesis() {
            (TableColor::Yellow, "(genesis)".to_string())
        } else {
            (TableColor::White, short_hash(&block.prev_hash_hex()))
        };

        table.add_row(vec![
            Cell::new(format!("#{}", height)).fg(TableColor::White),
            Cell::new(short_hash(&block.hash_hex())).fg(kind_color),
            Cell::new(prev_text).fg(TableColor::Grey),
            Cell::new(block.nonce).fg(TableColor::White),
            Cell::new(payload_text).fg(kind_color),
        ]);
    }

    println!("{}", table);
    println!();
    println!(
        "{}",
        format!("📦 Total blocks: {}", total).bright_blue()
    );
    println!(
        "{}",
        format!("🔗 Head: {}", hex::encode(ledger.head())).bright_blue()
    );
    println!();

    Ok(())
}

fn payload_preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.chars().count() > 32 {
        let prefix: String = text.chars().take(29).collect();
        format!("{}...", prefix)
    } else {
        text.to_string()
    }
}
