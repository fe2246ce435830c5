//! Service configuration

use anyhow::{Context, Result};
use optimizer_lib::{cost::InstancePrice, CostModel, SchedulerConfig};
use serde::Deserialize;
use std::time::Duration;

/// Optimizer configuration
///
/// Read from an optional file named by `OPTIMIZER_CONFIG_FILE`, then from
/// `OPTIMIZER_*` environment variables, which take precedence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptimizerConfig {
    /// Port for the query API and health/metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between scheduled analysis cycles
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Upper bound on each inventory or metrics call, in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Limit pod and deployment analysis to one namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// Hourly rate for nodes whose instance type is not in the price table
    #[serde(default = "default_hourly_rate")]
    pub default_hourly_rate: f64,

    /// Assumed provisioned storage in GB, priced into the cluster total
    #[serde(default = "default_storage_placeholder")]
    pub storage_placeholder_gb: f64,

    /// Pod estimate, USD per requested core-hour
    #[serde(default = "default_cpu_core_hour_rate")]
    pub cpu_core_hour_rate: f64,

    /// Pod estimate, USD per requested GiB-hour
    #[serde(default = "default_memory_gb_hour_rate")]
    pub memory_gb_hour_rate: f64,

    #[serde(default = "default_storage_cost_per_gb_month")]
    pub storage_cost_per_gb_month: f64,

    /// Extra or replacement rows for the instance pricing table
    #[serde(default)]
    pub instance_prices: Vec<InstancePrice>,
}

fn default_api_port() -> u16 {
    8080
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_hourly_rate() -> f64 {
    0.1
}

fn default_storage_placeholder() -> f64 {
    1000.0
}

fn default_cpu_core_hour_rate() -> f64 {
    0.05
}

fn default_memory_gb_hour_rate() -> f64 {
    0.01
}

fn default_storage_cost_per_gb_month() -> f64 {
    0.10
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            refresh_interval_secs: default_refresh_interval(),
            provider_timeout_secs: default_provider_timeout(),
            namespace: None,
            default_hourly_rate: default_hourly_rate(),
            storage_placeholder_gb: default_storage_placeholder(),
            cpu_core_hour_rate: default_cpu_core_hour_rate(),
            memory_gb_hour_rate: default_memory_gb_hour_rate(),
            storage_cost_per_gb_month: default_storage_cost_per_gb_month(),
            instance_prices: Vec::new(),
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from the optional file and the environment
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("OPTIMIZER_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(&path));
        }
        Self::from_builder(builder.add_source(
            config::Environment::with_prefix("OPTIMIZER").try_parsing(true),
        ))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build().context("Failed to read configuration")?;
        let parsed: Self = config
            .try_deserialize()
            .context("Invalid optimizer configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be greater than zero");
        }
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("provider_timeout_secs must be greater than zero");
        }
        let rates = [
            self.default_hourly_rate,
            self.storage_placeholder_gb,
            self.cpu_core_hour_rate,
            self.memory_gb_hour_rate,
            self.storage_cost_per_gb_month,
        ];
        if rates.iter().any(|r| *r < 0.0)
            || self.instance_prices.iter().any(|p| p.hourly_rate < 0.0)
        {
            anyhow::bail!("cost rates must not be negative");
        }
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.refresh_interval_secs),
            provider_timeout: Duration::from_secs(self.provider_timeout_secs),
            namespace: self.namespace.clone().filter(|ns| !ns.is_empty()),
        }
    }

    pub fn cost_model(&self) -> CostModel {
        let mut model = CostModel {
            default_hourly_rate: self.default_hourly_rate,
            cpu_core_hour_rate: self.cpu_core_hour_rate,
            memory_gb_hour_rate: self.memory_gb_hour_rate,
            storage_cost_per_gb_month: self.storage_cost_per_gb_month,
            storage_placeholder_gb: self.storage_placeholder_gb,
            ..CostModel::default()
        };
        model.override_prices(self.instance_prices.iter().cloned());
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = OptimizerConfig::from_builder(builder()).unwrap();
        assert_eq!(config, OptimizerConfig::default());
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.refresh_interval_secs, 300);
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = OptimizerConfig::from_builder(
            builder()
                .set_override("api_port", 9090)
                .unwrap()
                .set_override("refresh_interval_secs", 60)
                .unwrap()
                .set_override("namespace", "shop")
                .unwrap()
                .set_override("default_hourly_rate", 0.25)
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.api_port, 9090);
        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.interval, Duration::from_secs(60));
        assert_eq!(scheduler.provider_timeout, Duration::from_secs(30));
        assert_eq!(scheduler.namespace.as_deref(), Some("shop"));
        assert_eq!(config.cost_model().hourly_rate("no-such-type"), 0.25);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = OptimizerConfig::from_builder(
            builder().set_override("refresh_interval_secs", 0).unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_instance_prices_from_file() {
        let source = config::File::from_str(
            r#"{
                "cpu_core_hour_rate": 0.04,
                "instance_prices": [
                    { "instance_type": "m5.large", "hourly_rate": 0.08 },
                    { "instance_type": "r6i.large", "hourly_rate": 0.126 }
                ]
            }"#,
            config::FileFormat::Json,
        );
        let config = OptimizerConfig::from_builder(builder().add_source(source)).unwrap();

        let model = config.cost_model();
        assert_eq!(model.hourly_rate("m5.large"), 0.08);
        assert_eq!(model.hourly_rate("r6i.large"), 0.126);
        assert_eq!(model.hourly_rate("t3.large"), 0.0832);
        assert_eq!(model.cpu_core_hour_rate, 0.04);
        assert_eq!(model.memory_gb_hour_rate, 0.01);
        assert_eq!(model.storage_monthly_cost(model.storage_placeholder_gb), 100.0);
    }

    #[test]
    fn test_negative_rate_rejected() {
        let result = OptimizerConfig::from_builder(
            builder().set_override("cpu_core_hour_rate", -1.0).unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_namespace_means_all() {
        let config = OptimizerConfig {
            namespace: Some(String::new()),
            ..Default::default()
        };
        assert!(config.scheduler_config().namespace.is_none());
    }
}
