use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const CONFIG_DIR: &str = "shotlight_terminal";
const IDENTITY_FILE: &str = "identity.json";
const IDENTITY_VERSION: u32 = 1;

/// The backend rejects shorter identifiers.
pub const MIN_CLIENT_ID_LEN: usize = 10;

/// Per-install identifier sent as `client_id` on every backend call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() < MIN_CLIENT_ID_LEN {
            return Err(anyhow!(
                "client id must be at least {MIN_CLIENT_ID_LEN} characters (got {:?})",
                trimmed
            ));
        }
        if trimmed.chars().any(|c| c.is_whitespace()) {
            return Err(anyhow!("client id must not contain whitespace"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityFile {
    version: u32,
    client_id: String,
}

/// Single-key store: created on first launch, read thereafter.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: Option<PathBuf>,
}

impl IdentityStore {
    pub fn open_default() -> Self {
        Self {
            path: identity_path(),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Option<ClientId> {
        let path = self.path.as_ref()?;
        let raw = fs::read_to_string(path).ok()?;
        let file = serde_json::from_str::<IdentityFile>(&raw).ok()?;
        if file.version != IDENTITY_VERSION {
            return None;
        }
        ClientId::parse(&file.client_id).ok()
    }

    pub fn load_or_create(&self) -> Result<ClientId> {
        if let Some(id) = self.load() {
            return Ok(id);
        }
        let id = ClientId::generate();
        self.save(&id)?;
        Ok(id)
    }

    pub fn save(&self, id: &ClientId) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            // No writable home: the id lives for this run only.
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create identity dir {}", dir.display()))?;
        }
        let file = IdentityFile {
            version: IDENTITY_VERSION,
            client_id: id.as_str().to_string(),
        };
        let json = serde_json::to_string_pretty(&file).context("serialize identity")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write identity")?;
        fs::rename(&tmp, path).context("swap identity")?;
        Ok(())
    }
}

/// Env override wins and is never written back.
pub fn resolve_client_id(store: &IdentityStore, env_override: Option<&str>) -> Result<ClientId> {
    if let Some(raw) = env_override {
        return ClientId::parse(raw).context("invalid SHOTLIGHT_CLIENT_ID");
    }
    store.load_or_create()
}

fn identity_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CONFIG_DIR).join(IDENTITY_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(IDENTITY_FILE),
    )
}
