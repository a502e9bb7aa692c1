//! Durable token storage on disk

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::tokens::{StoreError, TokenSet, TokenStore};

/// Fixed key the credential record lives under.
pub const STORAGE_KEY: &str = "authorization";

const TOKEN_FILE: &str = "tokens.toml";

/// Token store backed by a TOML file in the user's data directory.
///
/// The file is a key-value table; this store only ever touches the
/// [`STORAGE_KEY`] record and rewrites the file on every change.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("net", "guardian-cli", "guardian-cli")
            .context("Could not determine data directory")?;
        Ok(Self::new(proj_dirs.data_dir().join(TOKEN_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> Result<BTreeMap<String, TokenSet>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn write_records(&self, records: &BTreeMap<String, TokenSet>) -> Result<(), StoreError> {
        if records.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(records)?;
        fs::write(&self.path, content)?;

        // Set restrictive permissions on the token file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, TokenSet>),
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = match self.read_records() {
            Ok(records) => records,
            Err(StoreError::Decode(e)) => {
                tracing::warn!("Replacing unreadable token file {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut records);
        self.write_records(&records)
    }
}

impl TokenStore for FileTokenStore {
    fn get_token(&self) -> Option<TokenSet> {
        match self.read_records() {
            Ok(mut records) => records.remove(STORAGE_KEY),
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set_token(&self, tokens: TokenSet) -> Result<(), StoreError> {
        self.update(|records| {
            records.insert(STORAGE_KEY.to_string(), tokens);
        })
    }

    fn remove_token(&self) -> Result<(), StoreError> {
        self.update(|records| {
            records.remove(STORAGE_KEY);
        })
    }

    fn remove_access_token(&self) -> Result<(), StoreError> {
        self.update(|records| {
            if let Some(tokens) = records.get_mut(STORAGE_KEY) {
                tokens.access_token = None;
            }
        })
    }
}
