//! Long-lived client identity, used only to count distinct participants.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

const SESSION_PREFIX: &str = "session_";
const RANDOM_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    session_id: String,
}

/// Generates a session id once, persists it to `path` and hands back the
/// same value for as long as that file exists.
pub struct SessionIdentity {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl SessionIdentity {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_or_create(&self) -> Result<String> {
        {
            let cached = match self.cached.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(id) = cached.as_ref() {
                return Ok(id.clone());
            }
        }

        let mut cached = match self.cached.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = match self.load()? {
            Some(id) => id,
            None => {
                let id = generate_session_id();
                self.persist(&id)?;
                info!("Created session identity {id}");
                id
            }
        };

        *cached = Some(id.clone());
        Ok(id)
    }

    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;

        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(stored) if !stored.session_id.trim().is_empty() => Ok(Some(stored.session_id)),
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(
                    "Ignoring unreadable session file {}: {err}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }

    fn persist(&self, session_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create session directory {}", parent.display())
                })?;
            }
        }

        let serialized = serde_json::to_string_pretty(&StoredSession {
            session_id: session_id.to_string(),
        })?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))
    }
}

/// `session_<unix millis>_<9 base36 chars>`.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{SESSION_PREFIX}{}_{suffix}", Utc::now().timestamp_millis())
}
