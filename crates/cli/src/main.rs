//! Kubernetes Cost Optimizer CLI
//!
//! A command-line tool for viewing cluster costs, recommendations and
//! proposed optimization actions served by the cost optimizer.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{actions, costs, metrics, recommendations};
use optimizer_lib::models::Priority;

/// Kubernetes Cost Optimizer CLI
#[derive(Parser)]
#[command(name = "kco")]
#[command(author, version, about = "CLI for the Kubernetes Cost Optimizer", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via KCO_API_URL env var)
    #[arg(long, env = "KCO_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show node utilization and cost
    Nodes,

    /// Show pod usage, requests and cost
    Pods {
        /// Filter by namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Show optimization recommendations
    Recommendations {
        /// Filter by namespace
        #[arg(long, short)]
        namespace: Option<String>,

        /// Minimum priority (low, medium, high)
        #[arg(long, short)]
        priority: Option<Priority>,
    },

    /// Show the cluster cost summary
    Costs,

    /// Request an immediate cost analysis
    Optimize,

    /// List or execute proposed optimization actions
    #[command(subcommand)]
    Actions(ActionsCommands),

    /// Show or change saved CLI defaults
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the saved defaults
    Show,

    /// Save the default API endpoint
    SetApiUrl {
        url: String,
    },

    /// Save the default namespace filter
    SetNamespace {
        namespace: String,
    },
}

#[derive(Subcommand)]
pub enum ActionsCommands {
    /// List proposed actions
    List,

    /// Execute a proposed action
    Execute {
        /// Action ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::Config::load()?;

    let api_url = config.api_url(cli.api_url.as_deref());
    let client = || client::ApiClient::new(&api_url);

    match cli.command {
        Commands::Nodes => {
            metrics::show_nodes(&client()?, cli.format).await?;
        }
        Commands::Pods { namespace } => {
            metrics::show_pods(&client()?, config.namespace(namespace), cli.format).await?;
        }
        Commands::Recommendations {
            namespace,
            priority,
        } => {
            recommendations::show_recommendations(
                &client()?,
                config.namespace(namespace),
                priority,
                cli.format,
            )
            .await?;
        }
        Commands::Costs => {
            costs::show_costs(&client()?, cli.format).await?;
        }
        Commands::Optimize => {
            recommendations::trigger_optimize(&client()?, cli.format).await?;
        }
        Commands::Actions(actions_cmd) => match actions_cmd {
            ActionsCommands::List => {
                actions::list_actions(&client()?, cli.format).await?;
            }
            ActionsCommands::Execute { id } => {
                actions::execute_action(&client()?, &id, cli.format).await?;
            }
        },
        Commands::Config(config_cmd) => {
            update_config(&mut config, config_cmd, cli.format)?;
        }
    }

    Ok(())
}

fn update_config(
    config: &mut config::Config,
    command: ConfigCommands,
    format: output::OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            return match format {
                output::OutputFormat::Json => output::print_json(config),
                output::OutputFormat::Table => {
                    println!("API URL:   {}", config.api_url(None));
                    println!(
                        "Namespace: {}",
                        config.default_namespace.as_deref().unwrap_or("(all)")
                    );
                    Ok(())
                }
            };
        }
        ConfigCommands::SetApiUrl { url } => {
            url::Url::parse(&url).context("Invalid API URL")?;
            config.api_url = Some(url);
        }
        ConfigCommands::SetNamespace { namespace } => {
            config.default_namespace = Some(namespace);
        }
    }

    let path = config.save()?;
    output::print_success(&format!("Saved {}", path.display()));
    Ok(())
}
