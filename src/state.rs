use crate::{
    client::{errors::StateError, StateStore},
    types::{Instance, PersistedState},
};
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Keeps the state of one application instance as a JSON document.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_instance(state_dir: &Path, instance: &Instance) -> Self {
        Self::new(state_dir.join(format!("{instance}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read(&self) -> Result<PersistedState, StateError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(StateError::Parse),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state yet. Starting empty.");
                Ok(PersistedState::default())
            }
            Err(error) => Err(StateError::Read(error)),
        }
    }

    async fn write(&self, state: &PersistedState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StateError::Write)?;
        }

        let bytes = serde_json::to_vec_pretty(state).map_err(StateError::Serialize)?;

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(StateError::Write)
    }
}
