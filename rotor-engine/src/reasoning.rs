//! Human-readable reasoning for journal entries and reports.
//!
//! Explains each decision in strategy terms: rankings annotated with
//! holding/target status, buys justified by rank, sells by rank decay or
//! falling out of the target set.

use rotor_core::domain::{SectorRanking, SizedTrade};

/// Render the decision reasoning for one pipeline run.
pub fn format_signal_reasoning(
    rankings: &[SectorRanking],
    current_holdings: &[String],
    trades: &[SizedTrade],
    exit_rank_threshold: usize,
) -> String {
    let buys: Vec<&str> = trades
        .iter()
        .filter(|t| t.is_buy())
        .map(|t| t.symbol.as_str())
        .collect();
    let sells: Vec<&str> = trades
        .iter()
        .filter(|t| t.is_sell())
        .map(|t| t.symbol.as_str())
        .collect();

    let mut lines = vec![
        "Signal Decision Reasoning:".to_string(),
        "=".repeat(40),
        String::new(),
        "Sector Rankings (12-1 Momentum):".to_string(),
    ];

    for r in rankings {
        let mut status = String::new();
        if current_holdings.iter().any(|h| h == &r.symbol) {
            status.push_str(" [HOLDING]");
        }
        if r.target_weight > 0.0 {
            status.push_str(" [TARGET]");
        }
        lines.push(format!(
            "  {}. {}: {:+.1}%{status}",
            r.rank,
            r.symbol,
            r.momentum * 100.0
        ));
    }

    lines.push(String::new());
    if current_holdings.is_empty() {
        lines.push("Current Holdings: None".to_string());
    } else {
        lines.push(format!("Current Holdings: {}", current_holdings.join(", ")));
    }

    lines.push(String::new());
    if buys.is_empty() {
        lines.push("Buying: None".to_string());
    } else {
        lines.push(format!("Buying: {}", buys.join(", ")));
        for buy in &buys {
            if let Some(r) = rankings.iter().find(|r| r.symbol == *buy) {
                lines.push(format!(
                    "  - {buy}: Rank {} (above threshold), momentum {:+.1}%",
                    r.rank,
                    r.momentum * 100.0
                ));
            }
        }
    }

    lines.push(String::new());
    if sells.is_empty() {
        lines.push("Selling: None".to_string());
    } else {
        lines.push(format!("Selling: {}", sells.join(", ")));
        for sell in &sells {
            let reason = match rankings.iter().find(|r| r.symbol == *sell) {
                Some(r) => format!(
                    "Rank {} dropped below threshold ({exit_rank_threshold})",
                    r.rank
                ),
                None => "No longer in target portfolio".to_string(),
            };
            lines.push(format!("  - {sell}: {reason}"));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
