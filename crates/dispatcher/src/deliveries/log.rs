//! LogDelivery - logs batch summaries via tracing

use contracts::{Batch, ContractError, Delivery, DeliveryReceipt};
use tracing::{info, instrument};

/// Delivery that only logs, for debugging pipelines without a downstream
pub struct LogDelivery {
    name: String,
}

impl LogDelivery {
    /// Create a new LogDelivery with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_batch_summary(&self, batch: &Batch<'_>) {
        info!(
            delivery = %self.name,
            tenant_id = %batch.tenant.tenant_id,
            actor_id = %batch.tenant.actor_id,
            batch = batch.index + 1,
            total = batch.total,
            records = batch.len(),
            "Batch received"
        );
    }
}

impl Delivery for LogDelivery {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_delivery_deliver",
        skip(self, batch),
        fields(delivery = %self.name, tenant = %batch.tenant)
    )]
    async fn deliver(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError> {
        self.log_batch_summary(&batch);
        Ok(DeliveryReceipt::default())
    }
}
