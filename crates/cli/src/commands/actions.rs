//! Optimization action commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_action_status, print_info, print_json, print_success, table, OutputFormat};

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    action_type: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Executed")]
    executed_at: String,
}

pub async fn list_actions(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let actions = client.actions().await?;

    match format {
        OutputFormat::Json => print_json(&actions)?,
        OutputFormat::Table => {
            if actions.is_empty() {
                print_info("No actions proposed");
                return Ok(());
            }

            let rows: Vec<ActionRow> = actions
                .iter()
                .map(|a| ActionRow {
                    id: a.id.clone(),
                    action_type: a.action_type.clone(),
                    resource: a.resource.clone(),
                    action: a.action.clone(),
                    status: color_action_status(a.status),
                    executed_at: a
                        .executed_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            println!("{}", table(rows));
        }
    }

    Ok(())
}

pub async fn execute_action(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let action = client.execute_action(id).await?;

    match format {
        OutputFormat::Json => print_json(&action)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Action {} ({}) on {} is now {}",
                action.id,
                action.action,
                action.resource,
                color_action_status(action.status)
            ));
        }
    }

    Ok(())
}
