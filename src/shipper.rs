use crate::config::parse::validate_config;
use crate::config::{ConfigError, OverflowStrategy, ShipperConfig};
use crate::formatter::{DeviceMetadata, RecordFormatter};
use crate::pipeline::{event_channel, run_writer, EventSender};
use crate::remote::{HttpIngestClient, IngestError, LogIngest};
use crate::storage::event_store::EventStore;
use crate::storage::token_store::TokenStore;
use crate::storage::StoreError;
use crate::uploader::{UploadEngine, UploadError};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ShipperError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("append queue full")]
    QueueFull,

    #[error("shipper is shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ShipperError>;

/// Client-side log shipper: accumulates records durably on local storage
/// and uploads them in ordered batches on demand.
///
/// `log()` is synchronous and non-blocking; everything that touches storage
/// or the network runs on the tokio runtime.
pub struct Shipper {
    formatter: RecordFormatter,
    app_version: RwLock<String>,
    sender: StdMutex<Option<EventSender>>,
    overflow: OverflowStrategy,
    event_store: Arc<EventStore>,
    token_store: Arc<TokenStore>,
    ingest: Arc<dyn LogIngest>,
    engine: UploadEngine,
    cancel: CancellationToken,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Shipper {
    /// Build a shipper that talks to the configured HTTP endpoint.
    pub async fn new(config: ShipperConfig) -> Result<Self> {
        validate_config(&config)?;
        let ingest: Arc<dyn LogIngest> = Arc::new(HttpIngestClient::new(&config.endpoint)?);
        Self::with_client(config, ingest).await
    }

    /// Build a shipper around a caller-supplied ingestion client (an SDK
    /// wrapper, or a test double). The endpoint section of the config is
    /// ignored here.
    pub async fn with_client(
        config: ShipperConfig,
        ingest: Arc<dyn LogIngest>,
    ) -> Result<Self> {
        let event_store = Arc::new(EventStore::open(&config.storage.dir)?);
        let token_store = Arc::new(TokenStore::open(&config.storage.dir)?);

        // Configured destination names apply until runtime setters persist
        // something else.
        token_store
            .seed_destination(
                &config.destination.group_name,
                &config.destination.stream_name,
            )
            .await?;

        let app_version = token_store.app_version().await.unwrap_or_default();
        let formatter = RecordFormatter::new(DeviceMetadata::detect(&config.device));

        let (sender, receiver) = event_channel(config.pipeline.queue_capacity);
        let writer = tokio::spawn(run_writer(receiver, event_store.clone()));

        let engine = UploadEngine::new(ingest.clone(), event_store.clone(), token_store.clone());

        info!(
            storage_dir = %config.storage.dir.display(),
            queue_capacity = config.pipeline.queue_capacity,
            "Shipper started"
        );

        Ok(Self {
            formatter,
            app_version: RwLock::new(app_version),
            sender: StdMutex::new(Some(sender)),
            overflow: config.pipeline.overflow,
            event_store,
            token_store,
            ingest,
            engine,
            cancel: CancellationToken::new(),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Queue one record for durable storage. Non-blocking; returns
    /// `QueueFull` (or drops with a warning, per config) when the append
    /// queue is saturated.
    pub fn log(
        &self,
        message: &str,
        label: Option<&str>,
        phase: Option<&str>,
        module: Option<&str>,
    ) -> Result<()> {
        let app_version = self.app_version.read().unwrap().clone();
        let event = self
            .formatter
            .format(message, label, phase, module, &app_version);

        let guard = self.sender.lock().unwrap();
        let Some(sender) = guard.as_ref() else {
            return Err(ShipperError::Closed);
        };

        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => match self.overflow {
                OverflowStrategy::Block => Err(ShipperError::QueueFull),
                OverflowStrategy::Drop => {
                    warn!(message = %event.message, "Append queue full; dropping record");
                    Ok(())
                }
            },
            Err(TrySendError::Closed(_)) => Err(ShipperError::Closed),
        }
    }

    pub async fn set_log_group_name(&self, name: &str) -> Result<()> {
        self.token_store.set_group_name(name.to_string()).await?;
        Ok(())
    }

    pub async fn set_app_version(&self, version: &str) -> Result<()> {
        self.token_store
            .set_app_version(version.to_string())
            .await?;
        *self.app_version.write().unwrap() = version.to_string();
        Ok(())
    }

    /// Persist `name` as the destination stream and create it remotely,
    /// scoped to the currently configured group. Safe to call when the
    /// stream already exists.
    pub async fn create_log_stream(&self, name: &str) -> Result<()> {
        self.token_store.set_stream_name(name.to_string()).await?;
        let group_name = self.token_store.group_name().await;
        self.ingest.create_stream(&group_name, name).await?;
        info!(group_name = %group_name, stream_name = %name, "Log stream created");
        Ok(())
    }

    /// Run one upload cycle over everything currently pending.
    pub async fn upload_logs(&self) -> Result<()> {
        self.engine.run_cycle(&self.cancel).await?;
        Ok(())
    }

    /// Number of records currently pending upload.
    pub async fn saved_logs_count(&self) -> Result<usize> {
        Ok(self.event_store.count().await?)
    }

    /// Clear the continuation token, destination names, and app version in
    /// one atomic step.
    pub async fn reset_preferences(&self) -> Result<()> {
        self.token_store.reset().await?;
        self.app_version.write().unwrap().clear();
        Ok(())
    }

    /// Stop accepting records, abort any in-flight upload cycle at the next
    /// batch boundary, and drain queued appends to disk.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        // Closing the channel lets the writer drain and exit.
        self.sender.lock().unwrap().take();

        if let Some(handle) = self.writer.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Writer task join error during shutdown");
            }
        }

        info!("Shipper shut down");
    }
}
