use futures::future::join_all;
use moka::future::Cache;
use std::sync::Arc;

use crate::record::TaxpayerRecord;
use crate::transport::{Fetched, Freshness, Transport, TransportError};

/// Where the taxpayer records live below the data root.
pub const DEFAULT_RECORD_DIRECTORY: &str = "data/contribuyentes";

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("no data found for the taxpayer {identifier}")]
    DataNotFound { identifier: String },
    #[error("the record of the taxpayer {identifier} could not be retrieved: {source}")]
    Transport {
        identifier: String,
        #[source]
        source: TransportError,
    },
    #[error("the record of the taxpayer {identifier} is malformed: {source}")]
    Malformed {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads taxpayer records by identifier and keeps them until `clear_cache` is called.
/// Concurrent requests for the same identifier share a single retrieval, failures are not kept.
pub struct TaxpayerDataLoader {
    transport: Arc<dyn Transport>,
    record_directory: String,
    records: Cache<String, Arc<TaxpayerRecord>>,
}

impl TaxpayerDataLoader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_record_directory(transport, DEFAULT_RECORD_DIRECTORY)
    }

    pub fn with_record_directory(
        transport: Arc<dyn Transport>,
        record_directory: impl Into<String>,
    ) -> Self {
        TaxpayerDataLoader {
            transport,
            record_directory: record_directory.into().trim_matches('/').to_string(),
            records: Cache::builder().build(),
        }
    }

    pub fn record_path(&self, identifier: &str) -> String {
        if self.record_directory.is_empty() {
            format!("{identifier}.json")
        } else {
            format!("{}/{identifier}.json", self.record_directory)
        }
    }

    pub async fn fetch(&self, identifier: &str) -> Result<Arc<TaxpayerRecord>, Arc<LoaderError>> {
        self.records
            .try_get_with(identifier.to_string(), self.retrieve(identifier))
            .await
    }

    async fn retrieve(&self, identifier: &str) -> Result<Arc<TaxpayerRecord>, LoaderError> {
        let path = self.record_path(identifier);
        let bytes = match self.transport.fetch(&path, Freshness::NoCache).await {
            Ok(Fetched::Found(bytes)) => bytes,
            Ok(Fetched::Missing) => {
                return Err(LoaderError::DataNotFound {
                    identifier: identifier.to_string(),
                })
            }
            Err(source) => {
                return Err(LoaderError::Transport {
                    identifier: identifier.to_string(),
                    source,
                })
            }
        };

        let record: TaxpayerRecord =
            serde_json::from_slice(&bytes).map_err(|source| LoaderError::Malformed {
                identifier: identifier.to_string(),
                source,
            })?;
        log::debug!("Loaded the record of the taxpayer {} from {:?}", identifier, path);

        Ok(Arc::new(record))
    }

    /// Loads every identifier from `start` to `end` inclusive, concurrently. The identifiers
    /// which fail to load are logged and left out of the result.
    pub async fn fetch_range(&self, start: u64, end: u64) -> Vec<Arc<TaxpayerRecord>> {
        let identifiers: Vec<String> = (start..=end).map(|number| number.to_string()).collect();
        let results = join_all(identifiers.iter().map(|identifier| self.fetch(identifier))).await;

        identifiers
            .iter()
            .zip(results)
            .filter_map(|(identifier, result)| match result {
                Ok(record) => Some(record),
                Err(error) => {
                    log::warn!("Skipping the taxpayer {}: {}", identifier, error);
                    None
                }
            })
            .collect()
    }

    pub async fn clear_cache(&self) {
        self.records.invalidate_all();
        self.records.run_pending_tasks().await;
    }
}
