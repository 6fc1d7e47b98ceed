// SQS client construction
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::Client;
use thiserror::Error;
use tracing::{debug, info};

/// Connection setup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("No AWS region configured (set --region, AWS_REGION or a profile region)")]
    MissingRegion,

    #[error("Invalid queue URL '{0}': expected an http(s) URL")]
    InvalidQueueUrl(String),
}

/// Where and how to reach SQS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqsSettings {
    /// Region override; otherwise resolved from the environment/profile
    pub region: Option<String>,
    /// Endpoint override (LocalStack, ElasticMQ, ...)
    pub endpoint_url: Option<String>,
}

/// Build one SQS client shared by the source and destination queues.
///
/// Credentials come from the default AWS chain. SDK-level retries are
/// disabled: failed calls surface to the relay, which absorbs them per round.
pub async fn connect(settings: &SqsSettings) -> Result<Client, ConnectionError> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(RetryConfig::disabled());

    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &settings.endpoint_url {
        debug!(endpoint = %endpoint, "Using custom SQS endpoint");
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;
    let region = sdk_config
        .region()
        .ok_or(ConnectionError::MissingRegion)?
        .to_string();
    info!(region = %region, "SQS client ready");

    Ok(Client::new(&sdk_config))
}

/// Reject queue identifiers that are not URLs
pub fn validate_queue_url(url: &str) -> Result<(), ConnectionError> {
    let valid = (url.starts_with("https://") || url.starts_with("http://"))
        && url.split("://").nth(1).is_some_and(|rest| rest.contains('/'));
    if valid {
        Ok(())
    } else {
        Err(ConnectionError::InvalidQueueUrl(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_queue_urls() {
        tokio_test::assert_ok!(validate_queue_url(
            "https://sqs.us-east-1.amazonaws.com/123456789012/orders"
        ));
        tokio_test::assert_ok!(validate_queue_url(
            "http://localhost:4566/000000000000/orders-dlq"
        ));
    }

    #[test]
    fn test_rejects_bare_names() {
        assert_eq!(
            validate_queue_url("orders"),
            Err(ConnectionError::InvalidQueueUrl("orders".to_string()))
        );
        tokio_test::assert_err!(validate_queue_url("https://sqs.us-east-1.amazonaws.com"));
    }

    #[tokio::test]
    async fn test_connect_with_explicit_region() {
        let settings = SqsSettings {
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("http://localhost:4566".to_string()),
        };
        let client = connect(&settings).await.unwrap();
        assert_eq!(
            client.config().region().map(|r| r.to_string()),
            Some("eu-west-1".to_string())
        );
    }
}
