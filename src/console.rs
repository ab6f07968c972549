//! Colorful console output for plans and score analysis.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::converters::from_seconds;
use crate::domain::RoutePlan;
use crate::score::HardSoftScore;
use crate::scoring::ConstraintAnalysis;

/// Banner printed once at startup.
pub fn print_banner() {
    let banner = r#"
  ____  _       _             _         ____  _     _
 |  _ \(_) __ _| |     __ _  | |       |  _ \(_) __| | ___
 | | | | |/ _` | |___ / _` | | |_____  | |_) | |/ _` |/ _ \
 | |_| | | (_| | |___| (_| | |_|_____| |  _ <| | (_| |  __/
 |____/|_|\__,_|_|    \__,_| (_)       |_| \_\_|\__,_|\___|
"#;
    eprintln!("{}", banner.cyan().bold());
    eprintln!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Pickup & Drop-off Routing".bright_cyan()
    );
}

/// Prints plan size and the assignment state.
pub fn print_plan_summary(plan: &RoutePlan) {
    eprintln!(
        "{} {} {} Plan '{}': vehicles ({}), visits ({}), assigned ({}), driving ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Plan]".bright_cyan(),
        plan.name.white().bold(),
        plan.vehicles().len().to_formatted_string(&Locale::en).bright_yellow(),
        plan.visits().len().to_formatted_string(&Locale::en).bright_yellow(),
        plan.assigned_count().to_formatted_string(&Locale::en).bright_yellow(),
        format_duration(Duration::from_secs(plan.total_driving_time().max(0) as u64)).yellow()
    );

    for vehicle in plan.vehicles() {
        let stops: Vec<&str> = vehicle
            .route()
            .iter()
            .map(|&v| plan.visits()[v].id.as_str())
            .collect();
        eprintln!(
            "    {} {:<12} {:>3}/{:<3} departs {} │ {}",
            "→".bright_blue(),
            vehicle.id.white(),
            vehicle.total_demand(),
            vehicle.capacity,
            from_seconds(vehicle.departure_time).format("%H:%M"),
            if stops.is_empty() {
                "(idle)".bright_black().to_string()
            } else {
                stops.join(" → ")
            }
        );
    }
}

/// Prints the per-constraint breakdown followed by a summary box.
pub fn print_analysis(score: HardSoftScore, analysis: &[ConstraintAnalysis], elapsed: Duration) {
    eprintln!(
        "{} {} {} Scoring ended: time spent ({}), score ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Scorer]".bright_cyan(),
        format_duration(elapsed).yellow(),
        format_score(&score.to_string())
    );

    for constraint in analysis {
        let matches = constraint.matches.len().to_formatted_string(&Locale::en);
        eprintln!(
            "    {} {:<34} {:>8} matches │ {}",
            if constraint.matches.is_empty() {
                "✓".bright_green().to_string()
            } else {
                "✗".bright_red().to_string()
            },
            constraint.name,
            matches,
            format_score(&constraint.score.to_string())
        );
    }

    eprintln!();
    eprintln!("{}", "╔══════════════════════════════════════════════════════════╗".bright_cyan());

    let feasible = score.is_feasible();
    let status_text = if feasible {
        "✓ FEASIBLE PLAN"
    } else {
        "✗ INFEASIBLE (hard constraints violated)"
    };
    let status_colored = if feasible {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };
    let status_padding = 56 - status_text.chars().count();
    let left_pad = status_padding / 2;
    eprintln!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(status_padding - left_pad),
        "║".bright_cyan()
    );

    eprintln!("{}", "╠══════════════════════════════════════════════════════════╣".bright_cyan());
    eprintln!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        "Score:",
        score.to_string(),
        "║".bright_cyan()
    );
    eprintln!("{}", "╚══════════════════════════════════════════════════════════╝".bright_cyan());
    eprintln!();
}

fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Colors a score by sign; strings that are not scores are printed as-is.
fn format_score(score: &str) -> String {
    let Ok(parsed) = score.parse::<HardSoftScore>() else {
        return score.white().to_string();
    };

    let hard = format!("{}hard", parsed.hard());
    let hard = if parsed.hard() < 0 {
        hard.bright_red().to_string()
    } else {
        hard.bright_green().to_string()
    };

    let soft = format!("{}soft", parsed.soft());
    let soft = match parsed.soft() {
        s if s < 0 => soft.yellow().to_string(),
        0 => soft.white().to_string(),
        _ => soft.bright_green().to_string(),
    };

    format!("{}/{}", hard, soft)
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}
