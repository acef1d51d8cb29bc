//! FileDelivery - appends each batch as one NDJSON line

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use contracts::{Batch, ContractError, Delivery, DeliveryReceipt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

/// One line of the output file
#[derive(Debug, Serialize)]
struct BatchLine<'a> {
    delivered_at: String,
    tenant_id: &'a str,
    actor_id: &'a str,
    /// One-based
    batch: usize,
    total: usize,
    records: Vec<&'a Value>,
}

/// Delivery that writes batches to a local file (dry runs, replay)
pub struct FileDelivery {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileDelivery {
    /// Open `path` for appending, creating parent directories as needed
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            file: Mutex::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let path = params.get("path").ok_or_else(|| {
            ContractError::config_validation("delivery.params.path", "missing 'path' parameter")
        })?;
        Ok(Self::new(name, path)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(batch: &Batch<'_>) -> Result<Vec<u8>, ContractError> {
        let line = BatchLine {
            delivered_at: Utc::now().to_rfc3339(),
            tenant_id: batch.tenant.tenant_id.as_str(),
            actor_id: batch.tenant.actor_id.as_str(),
            batch: batch.index + 1,
            total: batch.total,
            records: batch.records.iter().map(|r| &r.payload).collect(),
        };
        let mut bytes = serde_json::to_vec(&line).map_err(|e| ContractError::Other(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl Delivery for FileDelivery {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_delivery_deliver",
        skip(self, batch),
        fields(delivery = %self.name, tenant = %batch.tenant, batch = batch.index + 1)
    )]
    async fn deliver(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError> {
        let bytes = Self::encode(&batch)?;

        let mut file = self.file.lock().await;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| {
                error!(path = %self.path.display(), error = %e, "Write failed");
                ContractError::delivery_transport(&self.name, e.to_string())
            })?;

        debug!(records = batch.len(), "Batch written");
        Ok(DeliveryReceipt::default())
    }
}
