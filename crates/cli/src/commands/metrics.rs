//! Node and pod metrics commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, PodResourceRecord};
use crate::output::{
    color_utilization, format_cores, format_currency, format_gib, print_info, print_json, table,
    OutputFormat,
};

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "Instance Type")]
    instance_type: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU %")]
    cpu_utilization: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Memory %")]
    memory_utilization: String,
    #[tabled(rename = "$/hr")]
    hourly_rate: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
}

#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "CPU Used/Req")]
    cpu: String,
    #[tabled(rename = "Memory Used/Req")]
    memory: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
}

pub async fn show_nodes(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let nodes = client.nodes().await?;

    match format {
        OutputFormat::Json => print_json(&nodes)?,
        OutputFormat::Table => {
            if nodes.is_empty() {
                print_info("No node data yet. The first analysis may still be running.");
                return Ok(());
            }

            let rows: Vec<NodeRow> = nodes
                .iter()
                .map(|n| NodeRow {
                    name: n.name.clone(),
                    instance_type: n.instance_type.clone(),
                    cpu: format!(
                        "{}/{}",
                        format_cores(n.cpu_usage_cores),
                        format_cores(n.cpu_capacity_cores)
                    ),
                    cpu_utilization: color_utilization(n.cpu_utilization),
                    memory: format!(
                        "{}/{}",
                        format_gib(n.memory_usage_gb),
                        format_gib(n.memory_capacity_gb)
                    ),
                    memory_utilization: color_utilization(n.memory_utilization),
                    hourly_rate: format!("{:.4}", n.hourly_rate),
                    monthly: format_currency(n.estimated_monthly_cost),
                })
                .collect();

            println!("{}", table(rows));
        }
    }

    Ok(())
}

pub async fn show_pods(
    client: &ApiClient,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let pods = filter_namespace(client.pods().await?, namespace.as_deref());

    match format {
        OutputFormat::Json => print_json(&pods)?,
        OutputFormat::Table => {
            if pods.is_empty() {
                print_info("No pods found");
                return Ok(());
            }

            let rows: Vec<PodRow> = pods
                .iter()
                .map(|p| PodRow {
                    namespace: p.namespace.clone(),
                    name: p.name.clone(),
                    cpu: format!(
                        "{}/{}",
                        format_cores(p.cpu_usage_cores),
                        format_cores(p.cpu_request_cores)
                    ),
                    memory: format!(
                        "{}/{}",
                        format_gib(p.memory_usage_gb),
                        format_gib(p.memory_request_gb)
                    ),
                    monthly: format_currency(p.estimated_monthly_cost),
                })
                .collect();

            println!("{}", table(rows));
        }
    }

    Ok(())
}

fn filter_namespace(pods: Vec<PodResourceRecord>, namespace: Option<&str>) -> Vec<PodResourceRecord> {
    match namespace {
        Some(ns) => pods.into_iter().filter(|p| p.namespace == ns).collect(),
        None => pods,
    }
}
