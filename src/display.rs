use crate::processor::{NormalizedChainView, NormalizedRecord, Side};
use crate::session::ChainSnapshot;
use colored::{ColoredString, Colorize};

const RULE_WIDTH: usize = 78;

fn rule() -> ColoredString {
    "=".repeat(RULE_WIDTH).blue()
}

/// Plain-text table rows, header first. Kept separate from coloring so the
/// layout can be checked without a terminal.
pub fn table_lines(records: &[NormalizedRecord]) -> Vec<String> {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(format!(
        "{:>8} {:>12} {:>10} {:>10} {:>7}  {}",
        "Strike", "OI", "Chg OI", "LTP", "IV", "Activity"
    ));
    for rec in records {
        lines.push(format!(
            "{:>8} {:>12} {:>10} {:>10.2} {:>7.2}  {}",
            rec.strike_price,
            rec.open_interest,
            rec.change_in_oi,
            rec.last_price,
            rec.implied_volatility,
            rec.activity
        ));
    }
    lines
}

fn print_side(view: &NormalizedChainView, side: Side) {
    let (title, highlight) = match side {
        Side::Call => ("CE Option Data".red().bold(), "red"),
        Side::Put => ("PE Option Data".green().bold(), "green"),
    };
    println!("{}", title);

    let max_row = view.max_oi_row(side);
    for (i, line) in table_lines(view.side(side)).into_iter().enumerate() {
        if i == 0 {
            println!("{}", line.bold());
        } else if Some(i - 1) == max_row {
            println!("{}", line.color(highlight).bold().reversed());
        } else {
            println!("{}", line);
        }
    }
    println!();
}

/// Render one snapshot/expiry view to stdout
pub fn print_view(snapshot: &ChainSnapshot, view: &NormalizedChainView) {
    println!("{}", rule());
    println!(
        "{} {} {}",
        snapshot.index.to_string().yellow().bold(),
        "Option Chain Analysis - Expiry Date:".green().bold(),
        view.expiry.yellow()
    );
    println!("{}", rule());
    if let Some(ts) = &snapshot.timestamp {
        println!("{} Exchange time: {}", "ℹ".blue(), ts);
    }
    if let Some(underlying) = snapshot.underlying_value {
        println!("{} Underlying: {:.2}", "ℹ".blue(), underlying);
    }
    println!(
        "{} Fetched at: {}",
        "ℹ".blue(),
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S")
    );
    if view.excluded > 0 {
        println!(
            "{} {} strike(s) skipped (one side missing)",
            "⚠".yellow(),
            view.excluded
        );
    }
    println!();

    print_side(view, Side::Call);
    print_side(view, Side::Put);

    let summary = view.summary();
    println!("{}", "Summary".cyan().bold());
    println!(
        "  CE OI: {} (chg {})   PE OI: {} (chg {})",
        summary.ce_totals.total_oi,
        summary.ce_totals.total_change_oi,
        summary.pe_totals.total_oi,
        summary.pe_totals.total_change_oi
    );
    match summary.put_call_ratio {
        Some(pcr) => println!("  PCR: {:.2}", pcr),
        None => println!("  PCR: n/a"),
    }
    for (label, counts) in [("CE", &summary.ce_activity), ("PE", &summary.pe_activity)] {
        let parts: Vec<String> = counts
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(activity, n)| format!("{}: {}", activity, n))
            .collect();
        println!("  {} activity: {}", label, parts.join(", "));
    }
    println!("{}", rule());
}

/// List of expiries with the selected one marked
pub fn print_expiries(snapshot: &ChainSnapshot, selected: &str) {
    println!("{}", "Available expiries:".cyan());
    for expiry in snapshot.chain.expiries() {
        if expiry == selected {
            println!("  {} {}", "→".green(), expiry.yellow().bold());
        } else {
            println!("    {}", expiry);
        }
    }
    println!();
}
