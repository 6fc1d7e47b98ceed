// Command-line arguments and their translation into relay settings

use clap::Parser;
use sqspipe_core::application::worker::constants::{DEFAULT_MAX_IDLE, DEFAULT_WORKERS};
use sqspipe_core::application::RelayConfig;
use sqspipe_infra_sqs::connection::validate_queue_url;
use sqspipe_infra_sqs::SqsSettings;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "sqspipe")]
#[command(about = "Relay messages from one SQS queue to another", long_about = None)]
#[command(version)]
pub struct Args {
    /// Source queue URL
    #[arg(long, env = "SQSPIPE_SOURCE")]
    pub source: String,

    /// Destination queue URL
    #[arg(long, env = "SQSPIPE_DESTINATION")]
    pub destination: String,

    /// Max idle time before stopping (1s-60s)
    #[arg(long = "max_idle", env = "SQSPIPE_MAX_IDLE", value_parser = humantime::parse_duration, default_value = "60s")]
    pub max_idle: Duration,

    /// Number of workers (1-20)
    #[arg(long, env = "SQSPIPE_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// AWS region (defaults to the environment/profile region)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom SQS endpoint (LocalStack, ElasticMQ)
    #[arg(long = "endpoint_url", env = "SQSPIPE_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Base delay after a failed round, doubled per consecutive failure (0s = retry immediately)
    #[arg(long = "error_backoff", env = "SQSPIPE_ERROR_BACKOFF", value_parser = humantime::parse_duration, default_value = "0s")]
    pub error_backoff: Duration,
}

impl Args {
    /// Validate flag values and build the relay configuration
    pub fn relay_config(&self) -> Result<RelayConfig, String> {
        validate_queue_url(&self.source).map_err(|e| format!("source: {e}"))?;
        validate_queue_url(&self.destination).map_err(|e| format!("destination: {e}"))?;
        if self.source == self.destination {
            return Err("source and destination must be different queues".to_string());
        }

        let config = RelayConfig {
            error_backoff: self.error_backoff,
            ..RelayConfig::new(self.workers, self.max_idle)
        };
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    pub fn sqs_settings(&self) -> SqsSettings {
        SqsSettings {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            source: String::new(),
            destination: String::new(),
            max_idle: DEFAULT_MAX_IDLE,
            workers: DEFAULT_WORKERS,
            region: None,
            endpoint_url: None,
            error_backoff: Duration::ZERO,
        }
    }
}
