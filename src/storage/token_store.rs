use super::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const DEFAULT_GROUP_NAME: &str = "default_log_group";
pub const DEFAULT_STREAM_NAME: &str = "default_log_stream";

const STATE_FILE: &str = "uploader_state.json";
const STATE_TMP_FILE: &str = "uploader_state.json.tmp";

/// The four durable uploader values: continuation token, destination group
/// and stream names, and the last-known app version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenState {
    sequence_token: Option<String>,
    group_name: Option<String>,
    stream_name: Option<String>,
    app_version: Option<String>,
}

/// Durable key-value store for the uploader state. Every mutation writes
/// the whole state file atomically (temp + rename), so a partial update or
/// partial reset is never observable.
pub struct TokenStore {
    path: PathBuf,
    tmp_path: PathBuf,
    state: Mutex<TokenState>,
}

impl TokenStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(STATE_FILE);

        let state = if path.exists() {
            let file = File::open(&path)?;
            match serde_json::from_reader(file) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, "Uploader state file unreadable, starting fresh");
                    TokenState::default()
                }
            }
        } else {
            TokenState::default()
        };

        Ok(Self {
            path,
            tmp_path: dir.join(STATE_TMP_FILE),
            state: Mutex::new(state),
        })
    }

    pub async fn sequence_token(&self) -> Option<String> {
        self.state.lock().await.sequence_token.clone()
    }

    /// Record the token returned by the most recent accepted (or
    /// already-accepted) submission.
    pub async fn set_sequence_token(&self, token: Option<String>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.sequence_token = token;
        self.persist(&state)
    }

    pub async fn group_name(&self) -> String {
        self.state
            .lock()
            .await
            .group_name
            .clone()
            .unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string())
    }

    pub async fn set_group_name(&self, name: String) -> Result<()> {
        let mut state = self.state.lock().await;
        state.group_name = Some(name);
        self.persist(&state)
    }

    pub async fn stream_name(&self) -> String {
        self.state
            .lock()
            .await
            .stream_name
            .clone()
            .unwrap_or_else(|| DEFAULT_STREAM_NAME.to_string())
    }

    pub async fn set_stream_name(&self, name: String) -> Result<()> {
        let mut state = self.state.lock().await;
        state.stream_name = Some(name);
        self.persist(&state)
    }

    pub async fn app_version(&self) -> Option<String> {
        self.state.lock().await.app_version.clone()
    }

    pub async fn set_app_version(&self, version: String) -> Result<()> {
        let mut state = self.state.lock().await;
        state.app_version = Some(version);
        self.persist(&state)
    }

    /// Apply configured destination names without clobbering anything a
    /// runtime setter already persisted.
    pub async fn seed_destination(&self, group_name: &str, stream_name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut changed = false;

        if state.group_name.is_none() {
            state.group_name = Some(group_name.to_string());
            changed = true;
        }
        if state.stream_name.is_none() {
            state.stream_name = Some(stream_name.to_string());
            changed = true;
        }

        if changed {
            self.persist(&state)?;
        }
        Ok(())
    }

    /// Clear all four values in one atomic write.
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = TokenState::default();
        self.persist(&state)
    }

    fn persist(&self, state: &TokenState) -> Result<()> {
        let mut tmp = File::create(&self.tmp_path)?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.write_all(b"\n")?;
        tmp.sync_all()?;
        std::fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }
}
