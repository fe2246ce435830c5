//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use optimizer_lib::models::{ActionStatus, Priority};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Render a rounded table from rows
pub fn table<T: tabled::Tabled>(rows: Vec<T>) -> String {
    tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string()
}

pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Savings in green, cost increases in red
pub fn color_savings(amount: f64) -> String {
    let formatted = format_currency(amount);
    if amount < 0.0 {
        formatted.red().to_string()
    } else {
        formatted.green().to_string()
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Utilization colored by how close it is to the scaling threshold
pub fn color_utilization(value: Option<f64>) -> String {
    let formatted = format_percent(value);
    match value {
        Some(v) if v > 90.0 => formatted.red().to_string(),
        Some(v) if v < 20.0 => formatted.yellow().to_string(),
        Some(_) => formatted.green().to_string(),
        None => formatted.dimmed().to_string(),
    }
}

pub fn format_cores(cores: f64) -> String {
    if cores < 1.0 {
        format!("{:.0}m", cores * 1000.0)
    } else {
        format!("{:.2}", cores)
    }
}

pub fn format_gib(gib: f64) -> String {
    if gib < 1.0 {
        format!("{:.0}Mi", gib * 1024.0)
    } else {
        format!("{:.2}Gi", gib)
    }
}

pub fn color_priority(priority: Priority) -> String {
    let label = priority.to_string();
    match priority {
        Priority::High => label.red().bold().to_string(),
        Priority::Medium => label.yellow().to_string(),
        Priority::Low => label.blue().to_string(),
    }
}

pub fn color_action_status(status: ActionStatus) -> String {
    match status {
        ActionStatus::Pending => "pending".yellow().to_string(),
        ActionStatus::Executed => "executed".green().to_string(),
    }
}
