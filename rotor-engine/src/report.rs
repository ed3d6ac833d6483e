//! Plain-text reports for the CLI.

use rotor_core::domain::MomentumSignal;
use rotor_core::universe::Universe;

use crate::engine::ExecutionReport;
use crate::orders::OrderStatus;
use crate::rebalance::RebalancePreview;

/// Render a momentum signal as a ranked sector table.
pub fn format_signal_report(signal: &MomentumSignal, universe: &Universe, cash: f64) -> String {
    let mut lines = vec![
        format!("MOMENTUM SIGNAL - {}", signal.signal_date),
        "=".repeat(60),
        String::new(),
        format!(
            "{:<6}{:<8}{:<14}{:<12}{}",
            "Rank", "Symbol", "Sector", "12-1 Mom", "Target"
        ),
        "-".repeat(60),
    ];

    for r in &signal.rankings {
        let display = universe.display_symbol(&r.symbol);
        let sector = universe.sector_name(&r.symbol).unwrap_or("");
        lines.push(format!(
            "{:<6}{:<8}{:<14}{:<12}{}",
            r.rank,
            display,
            sector,
            format!("{:+.1}%", r.momentum * 100.0),
            format!("{:.1}%", r.target_weight * 100.0),
        ));
    }

    lines.push(String::new());
    lines.push("-".repeat(60));

    let top: Vec<&str> = signal
        .top_sectors
        .iter()
        .map(|s| universe.display_symbol(s))
        .collect();
    lines.push(format!("Top {} sectors: {}", signal.top_n, top.join(", ")));

    if cash > 0.0 {
        lines.push(format!("Current cash: {cash:.2}"));
    }

    lines.push(String::new());
    lines.join("\n")
}

/// Render an execution report as readable text.
pub fn format_execution_report(report: &ExecutionReport) -> String {
    let mut lines = vec![
        format!("EXECUTION REPORT - {}", report.signal_date),
        "=".repeat(60),
        format!("Mode: {}", report.execution_mode.as_str().to_uppercase()),
        format!("Timestamp: {}", report.timestamp.to_rfc3339()),
        format!(
            "Status: {}",
            if report.success { "SUCCESS" } else { "FAILED" }
        ),
        String::new(),
    ];

    if !report.error_message.is_empty() {
        lines.push(format!("ERROR: {}", report.error_message));
        lines.push(String::new());
    }

    lines.push(format!("Total Equity: {:.2}", report.total_equity));
    lines.push(format!("Cash: {:.2}", report.cash));
    lines.push(String::new());
    lines.push(format!("Top Sectors: {}", report.top_sectors.join(", ")));
    lines.push(String::new());

    lines.push("Sector Rankings:".into());
    lines.push("-".repeat(40));
    for r in &report.rankings {
        lines.push(format!(
            "  {}. {}: {:+.1}% (target: {:.0}%)",
            r.rank,
            r.symbol,
            r.momentum * 100.0,
            r.target_weight * 100.0
        ));
    }

    lines.push(String::new());
    lines.push(format!("Trades ({}):", report.trades.len()));
    lines.push("-".repeat(40));
    if report.trades.is_empty() {
        lines.push("  No trades".into());
    } else {
        for t in &report.trades {
            lines.push(format!(
                "  {} {} {} @ {:.2} ({:.0})",
                t.action, t.shares, t.symbol, t.price, t.trade_value
            ));
        }
    }

    if let Some(validation) = &report.validation {
        lines.push(String::new());
        lines.push("Validation:".into());
        lines.push(format!(
            "  Status: {}",
            if validation.valid { "PASSED" } else { "FAILED" }
        ));
        lines.push(format!(
            "  Turnover: {:.1}%",
            validation.total_turnover_pct * 100.0
        ));
        lines.push(format!("  Message: {}", validation.reason));
    }

    if !report.execution_results.is_empty() {
        lines.push(String::new());
        lines.push("Execution Results:".into());
        lines.push("-".repeat(40));
        for r in &report.execution_results {
            lines.push(format!(
                "  [{}] {} {} {}",
                status_label(r.status).to_uppercase(),
                r.action,
                r.shares,
                r.symbol
            ));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Submitted => "submitted",
        OrderStatus::Filled => "filled",
        OrderStatus::Rejected => "rejected",
        OrderStatus::DryRun => "dry_run",
    }
}

/// Render a rebalance preview as a trade table for manual execution.
pub fn format_rebalance_report(preview: &RebalancePreview) -> String {
    let mut lines = vec![
        format!("REBALANCE TRADES - {}", preview.date),
        "=".repeat(60),
        String::new(),
        format!("Total Equity: {:.2}", preview.total_equity),
        format!("Cash Available: {:.2}", preview.cash),
        String::new(),
    ];

    if preview.trades.is_empty() {
        lines.push("No trades required. Portfolio is within threshold.".into());
        lines.push(String::new());
        return lines.join("\n");
    }

    lines.push(format!(
        "{:<8}{:<10}{:<10}{:<8}{:<8}{}",
        "Symbol", "Current", "Target", "Action", "Shares", "Est. Value"
    ));
    lines.push("-".repeat(60));

    for t in &preview.trades {
        lines.push(format!(
            "{:<8}{:<10}{:<10}{:<8}{:<8}{:.0}",
            t.symbol,
            format!("{:.1}%", t.current_weight * 100.0),
            format!("{:.1}%", t.target_weight * 100.0),
            t.action.to_string(),
            t.shares,
            t.trade_value,
        ));
    }

    lines.push(String::new());
    lines.push("-".repeat(60));

    let buys: Vec<_> = preview.trades.iter().filter(|t| t.is_buy()).collect();
    let sells: Vec<_> = preview.trades.iter().filter(|t| t.is_sell()).collect();
    let buy_value: f64 = buys.iter().map(|t| t.trade_value).sum();
    let sell_value: f64 = sells.iter().map(|t| t.trade_value).sum();

    lines.push(format!(
        "Total trades: {} ({} buys, {} sells)",
        preview.trades.len(),
        buys.len(),
        sells.len()
    ));
    lines.push(format!("Estimated buy value: {buy_value:.2}"));
    lines.push(format!("Estimated sell value: {sell_value:.2}"));
    lines.push(format!("Net cash flow: {:.2}", sell_value - buy_value));
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rotor_core::domain::SectorRanking;

    #[test]
    fn signal_report_lists_every_rank() {
        let universe = Universe::default_uk_sectors();
        let signal = MomentumSignal {
            signal_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            rankings: vec![
                SectorRanking {
                    symbol: "SXLK.L".into(),
                    momentum: 0.18,
                    rank: 1,
                    target_weight: 1.0,
                },
                SectorRanking {
                    symbol: "SXLU.L".into(),
                    momentum: -0.05,
                    rank: 2,
                    target_weight: 0.0,
                },
            ],
            top_sectors: vec!["SXLK.L".into()],
            top_n: 3,
        };

        let text = format_signal_report(&signal, &universe, 5_000.0);
        assert!(text.contains("MOMENTUM SIGNAL - 2025-06-02"));
        assert!(text.contains("SXLK"));
        assert!(text.contains("Technology"));
        assert!(text.contains("Utilities"));
        assert!(text.contains("Top 3 sectors: SXLK"));
        assert!(text.contains("Current cash: 5000.00"));
    }
}
