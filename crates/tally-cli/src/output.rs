//! Output formatting utilities.

use colored::Colorize;
use tabled::{Table, Tabled};
use tally_governance::{Address, EventRecord, Proposal};
use crate::scenario::{Outcome, Step};

/// Format address (short version).
pub fn format_address_short(addr: &Address) -> String {
    let s = format!("{:x}", addr);
    if s.len() > 12 {
        format!("{}...{}", &s[..8], &s[s.len() - 6..])
    } else {
        s
    }
}

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print one scenario step and what happened.
pub fn print_outcome(index: usize, step: &Step, outcome: &Outcome) {
    let label = format!("[{:>3}] {}", index + 1, step.label());
    match outcome {
        Outcome::Ok => print_success(&label),
        Outcome::Proposed(id) => print_success(&format!("{} -> #{}", label, id)),
        Outcome::Balance(balance) => print_success(&format!("{} -> treasury {}", label, balance)),
        Outcome::Rejected(err) => println!("{}", format!("✗ {}: {}", label, err).yellow()),
    }
}

#[derive(Tabled)]
struct ProposalRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Recipient")]
    recipient: String,
    #[tabled(rename = "For")]
    positive: String,
    #[tabled(rename = "Against")]
    negative: String,
    #[tabled(rename = "Net")]
    net: i128,
    #[tabled(rename = "Status")]
    status: String,
}

/// Render proposals as a table.
pub fn proposal_table<'a>(proposals: impl Iterator<Item = &'a Proposal>) -> String {
    let rows: Vec<ProposalRow> = proposals
        .map(|p| ProposalRow {
            id: p.id,
            name: p.name.clone(),
            amount: p.amount.to_string(),
            recipient: format_address_short(&p.recipient),
            positive: p.positive_weight.to_string(),
            negative: p.negative_weight.to_string(),
            net: p.net_votes,
            status: format!("{:?}", p.status()),
        })
        .collect();
    Table::new(rows).to_string()
}

/// Events as JSON lines.
pub fn print_events_json(events: &[EventRecord]) -> anyhow::Result<()> {
    for record in events {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
