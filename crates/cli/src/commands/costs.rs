//! Cost-related CLI commands

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_savings, format_currency, print_json, table, OutputFormat};

/// Row for the per-namespace cost table
#[derive(Tabled)]
struct NamespaceCostRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Monthly")]
    cost: String,
    #[tabled(rename = "Share")]
    share: String,
}

/// Show the cluster cost summary
pub async fn show_costs(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary = client.cost_summary().await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            println!("{}", "Cluster Cost Summary".bold());
            println!("{}", "=".repeat(50));
            println!("Nodes:                  {}", summary.node_count);
            println!("Pods:                   {}", summary.pod_count);
            println!("Recommendations:        {}", summary.recommendation_count);
            println!();

            println!("{}", "Monthly Costs".bold());
            println!("{}", "-".repeat(50));
            println!("Compute:                {}", format_currency(summary.compute_cost));
            println!("Storage:                {}", format_currency(summary.storage_cost));
            println!(
                "Total:                  {}",
                format_currency(summary.total_monthly_cost).bold()
            );
            println!(
                "Wasted:                 {}",
                format_currency(summary.wasted_resources).yellow()
            );
            println!();

            println!(
                "{} {}",
                "Potential Savings:".bold(),
                color_savings(summary.potential_savings).bold()
            );

            if !summary.namespace_costs.is_empty() {
                println!();
                println!("{}", "Cost by Namespace".bold());
                println!("{}", table(namespace_rows(&summary.namespace_costs)));
            }

            println!();
            println!(
                "Last updated: {}",
                summary
                    .last_updated
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
                    .dimmed()
            );
        }
    }

    Ok(())
}

/// Rows ordered by descending cost
fn namespace_rows(costs: &BTreeMap<String, f64>) -> Vec<NamespaceCostRow> {
    let total: f64 = costs.values().sum();
    let mut entries: Vec<(&String, &f64)> = costs.iter().collect();
    entries.sort_by(|a, b| b.1.total_cmp(a.1));

    entries
        .into_iter()
        .map(|(namespace, cost)| NamespaceCostRow {
            namespace: namespace.clone(),
            cost: format_currency(*cost),
            share: if total > 0.0 {
                format!("{:.1}%", cost / total * 100.0)
            } else {
                "n/a".to_string()
            },
        })
        .collect()
}
