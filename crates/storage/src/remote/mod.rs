use std::sync::Arc;

use async_trait::async_trait;
use study_core::model::{SessionOutcome, SessionReport, StudyItem, StudySetId};
use tracing::debug;

use crate::repository::{SessionReporter, Storage, StorageError, StudySetRepository};

mod client;
mod config;
mod mapping;

pub use client::{RpcClient, RpcError};
pub use config::{
    ConfigError, ENV_ACCESS_TOKEN, ENV_BACKEND_KEY, ENV_BACKEND_URL, ENV_RPC_TIMEOUT_SECS,
    RemoteConfig,
};

use mapping::{CompleteSessionParams, ItemDto, LoadItemsParams, items_from_wire};

/// Procedure returning the items of a study set.
pub const LOAD_ITEMS_RPC: &str = "get_study_set_items";
/// Procedure aggregating a finished session (XP, streaks, analytics).
pub const COMPLETE_SESSION_RPC: &str = "complete_study_session";

/// Repositories backed by named remote procedures.
#[derive(Clone, Debug)]
pub struct RemoteRepository {
    client: RpcClient,
}

impl RemoteRepository {
    #[must_use]
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns `RpcError` if the HTTP client cannot be built.
    pub fn connect(config: RemoteConfig) -> Result<Self, RpcError> {
        Ok(Self::new(RpcClient::new(config)?))
    }
}

#[async_trait]
impl StudySetRepository for RemoteRepository {
    async fn load_items(&self, set_id: StudySetId) -> Result<Vec<StudyItem>, StorageError> {
        let params = LoadItemsParams { p_set_id: set_id };
        let dtos: Option<Vec<ItemDto>> = self.client.call(LOAD_ITEMS_RPC, &params).await?;
        let dtos = dtos.ok_or(StorageError::NotFound)?;
        debug!(%set_id, count = dtos.len(), "loaded study set");
        items_from_wire(dtos)
    }
}

#[async_trait]
impl SessionReporter for RemoteRepository {
    async fn report_session(&self, report: &SessionReport) -> Result<SessionOutcome, StorageError> {
        let params = CompleteSessionParams::from_report(report);
        let outcome: Option<SessionOutcome> =
            self.client.call(COMPLETE_SESSION_RPC, &params).await?;
        Ok(outcome.unwrap_or_default())
    }
}

impl Storage {
    /// Build a `Storage` backed by the remote backend.
    ///
    /// # Errors
    ///
    /// Returns `RpcError` if the HTTP client cannot be built.
    pub fn remote(config: RemoteConfig) -> Result<Self, RpcError> {
        let repo = RemoteRepository::connect(config)?;
        let sets: Arc<dyn StudySetRepository> = Arc::new(repo.clone());
        let reporter: Arc<dyn SessionReporter> = Arc::new(repo);
        Ok(Self { sets, reporter })
    }
}
