//! Recommendation commands

use anyhow::Result;
use colored::Colorize;
use optimizer_lib::models::Priority;
use tabled::Tabled;

use crate::client::{ApiClient, Recommendation};
use crate::output::{
    color_priority, color_savings, print_info, print_json, print_success, print_warning, table,
    OutputFormat,
};

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Type")]
    recommendation_type: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Savings/mo")]
    savings: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(r: &Recommendation) -> Self {
        Self {
            priority: color_priority(r.priority),
            recommendation_type: r.recommendation_type.to_string(),
            // namespaced resources already read "<namespace>/<name>"
            resource: r.resource.clone(),
            description: r.description.clone(),
            savings: color_savings(r.potential_savings),
        }
    }
}

pub async fn show_recommendations(
    client: &ApiClient,
    namespace: Option<String>,
    min_priority: Option<Priority>,
    format: OutputFormat,
) -> Result<()> {
    let recs = filter(client.recommendations().await?, namespace.as_deref(), min_priority);

    match format {
        OutputFormat::Json => print_json(&recs)?,
        OutputFormat::Table => {
            if recs.is_empty() {
                print_info("No recommendations found");
                return Ok(());
            }

            let total: f64 = recs.iter().map(|r| r.potential_savings).sum();

            let rows: Vec<RecommendationRow> = recs.iter().map(RecommendationRow::from).collect();

            println!("{}", table(rows));
            println!();
            println!(
                "{} {} across {} recommendation(s)",
                "Net potential savings:".bold(),
                color_savings(total),
                recs.len()
            );
        }
    }

    Ok(())
}

/// Request an immediate analysis cycle
pub async fn trigger_optimize(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response = client.optimize().await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            if response.status == "optimization_coalesced" {
                print_warning(&response.message);
            } else {
                print_success(&response.message);
            }
        }
    }

    Ok(())
}

/// Keep recommendations in `namespace` at or above `min_priority`
///
/// Cluster-scoped recommendations (nodes) are dropped when a namespace
/// filter is given.
fn filter(
    recs: Vec<Recommendation>,
    namespace: Option<&str>,
    min_priority: Option<Priority>,
) -> Vec<Recommendation> {
    recs.into_iter()
        .filter(|r| match namespace {
            Some(ns) => r.namespace.as_deref() == Some(ns),
            None => true,
        })
        .filter(|r| min_priority.map_or(true, |p| r.priority >= p))
        .collect()
}
