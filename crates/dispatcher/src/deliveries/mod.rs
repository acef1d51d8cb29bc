//! Delivery implementations
//!
//! Contains HttpDelivery, FileDelivery, LogDelivery and MockDelivery, plus
//! the factory that builds one from configuration.

mod file;
mod http;
mod log;
mod mock;

use std::time::Duration;

use contracts::{Batch, ContractError, Delivery, DeliveryConfig, DeliveryReceipt, DeliveryType};
use tracing::instrument;

use crate::error::DispatcherError;

pub use self::file::FileDelivery;
pub use self::http::{HttpDelivery, HttpDeliveryConfig};
pub use self::log::LogDelivery;
pub use self::mock::{DeliveredBatch, MockDelivery};

/// Configured delivery target (enum dispatch over the built-in kinds)
pub enum AnyDelivery {
    Http(HttpDelivery),
    File(FileDelivery),
    Log(LogDelivery),
}

impl Delivery for AnyDelivery {
    fn name(&self) -> &str {
        match self {
            Self::Http(d) => d.name(),
            Self::File(d) => d.name(),
            Self::Log(d) => d.name(),
        }
    }

    async fn deliver(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError> {
        match self {
            Self::Http(d) => d.deliver(batch).await,
            Self::File(d) => d.deliver(batch).await,
            Self::Log(d) => d.deliver(batch).await,
        }
    }
}

/// Build a delivery target from configuration
#[instrument(
    name = "dispatcher_create_delivery",
    skip(config),
    fields(delivery = %config.name, delivery_type = ?config.delivery_type)
)]
pub fn create_delivery(
    config: &DeliveryConfig,
    timeout: Duration,
) -> Result<AnyDelivery, DispatcherError> {
    let creation_error = |e: ContractError| DispatcherError::delivery_creation(&config.name, e.to_string());

    match config.delivery_type {
        DeliveryType::Http => HttpDelivery::from_params(&config.name, &config.params, timeout)
            .map(AnyDelivery::Http)
            .map_err(creation_error),
        DeliveryType::File => FileDelivery::from_params(&config.name, &config.params)
            .map(AnyDelivery::File)
            .map_err(creation_error),
        DeliveryType::Log => Ok(AnyDelivery::Log(LogDelivery::new(&config.name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(delivery_type: DeliveryType, params: &[(&str, &str)]) -> DeliveryConfig {
        DeliveryConfig {
            name: "target".to_string(),
            delivery_type,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_create_each_kind() {
        let timeout = Duration::from_secs(15);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson");

        let http = create_delivery(
            &config(DeliveryType::Http, &[("url", "http://localhost:9/import")]),
            timeout,
        )
        .unwrap();
        match &http {
            AnyDelivery::Http(delivery) => {
                assert_eq!(delivery.url().as_str(), "http://localhost:9/import")
            }
            _ => panic!("unexpected delivery kind"),
        }

        let file = create_delivery(
            &config(DeliveryType::File, &[("path", path.to_str().unwrap())]),
            timeout,
        )
        .unwrap();
        match &file {
            AnyDelivery::File(delivery) => assert_eq!(delivery.path(), path.as_path()),
            _ => panic!("unexpected delivery kind"),
        }
        assert_eq!(file.name(), "target");

        let log = create_delivery(&config(DeliveryType::Log, &[]), timeout).unwrap();
        assert!(matches!(log, AnyDelivery::Log(_)));
    }

    #[test]
    fn test_missing_url_fails_creation() {
        let result = create_delivery(&config(DeliveryType::Http, &[]), Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(DispatcherError::DeliveryCreation { ref name, .. }) if name == "target"
        ));
    }
}
