//! Persistence of conversations between runs.
//!
//! A checkpoint is the committed history of one session. The agent loads
//! it once when resuming a session, and saves it after every completed
//! turn. Partial turns are never saved.

use std::collections::HashMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::conversation::Conversation;
use crate::error::Error;

/// A store that keeps conversations keyed by their session identifier.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Loads the conversation of the session, or `None` if the store has
    /// never seen it.
    async fn load(
        &self,
        session_id: &str,
    ) -> Result<Option<Conversation>, Error>;

    /// Saves the conversation, replacing the previous checkpoint of the
    /// same session.
    async fn save(&self, conversation: &Conversation) -> Result<(), Error>;
}

/// A non-persistent store, checkpoints are gone with the process.
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(
        &self,
        session_id: &str,
    ) -> Result<Option<Conversation>, Error> {
        Ok(self.conversations.read().await.get(session_id).cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), Error> {
        self.conversations
            .write()
            .await
            .insert(conversation.session_id().to_owned(), conversation.clone());
        Ok(())
    }
}

/// A store that writes one JSON file per session into a directory.
#[derive(Clone, Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    #[inline]
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory this store writes into.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, Error> {
        let acceptable = !session_id.is_empty()
            && session_id != "."
            && session_id != ".."
            && !session_id.contains(['/', '\\', '\0']);
        if !acceptable {
            return Err(Error::checkpoint(format!(
                "`{session_id}` is not a valid session id"
            )));
        }
        Ok(self.dir.join(format!("{session_id}.json")))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(
        &self,
        session_id: &str,
    ) -> Result<Option<Conversation>, Error> {
        let path = self.path_for(session_id)?;
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                debug!("no checkpoint at {}", path.display());
                return Ok(None);
            }
            Err(err) => {
                return Err(Error::checkpoint(format!(
                    "failed to read {}",
                    path.display()
                ))
                .with_source(err));
            }
        };

        let conversation: Conversation =
            serde_json::from_slice(&data).map_err(|err| {
                Error::checkpoint(format!("{} is corrupted", path.display()))
                    .with_source(err)
            })?;
        if conversation.session_id() != session_id {
            return Err(Error::checkpoint(format!(
                "{} belongs to session `{}`",
                path.display(),
                conversation.session_id()
            )));
        }
        Ok(Some(conversation))
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), Error> {
        let path = self.path_for(conversation.session_id())?;
        let data = serde_json::to_vec_pretty(conversation).map_err(|err| {
            Error::checkpoint("failed to encode the conversation")
                .with_source(err)
        })?;

        fs::create_dir_all(&self.dir).await.map_err(|err| {
            let dir = self.dir.display();
            Error::checkpoint(format!("failed to create {dir}"))
                .with_source(err)
        })?;

        // Write aside and swap in, so a crash never leaves half a file.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &data).await.map_err(|err| {
            Error::checkpoint(format!("failed to write {}", tmp_path.display()))
                .with_source(err)
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|err| {
            Error::checkpoint(format!("failed to replace {}", path.display()))
                .with_source(err)
        })?;

        trace!("saved checkpoint to {}", path.display());
        Ok(())
    }
}
