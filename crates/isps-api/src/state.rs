//! # Application State
//!
//! Shared state for the API: the versioned formation store, the
//! system-wide diploma registry, and the issuing authority key.
//!
//! ## Concurrency Model
//!
//! Workflow actions are single synchronous operations, but two safety
//! officers can race on the same formation. The store serializes every
//! mutation under a write lock and carries a per-record version; a
//! caller that supplies `expected_version` loses the race with a
//! conflict error and must refetch before retrying. The mutation
//! closure runs against a copy of the record, so a rejected action
//! commits nothing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use isps_issuance::{DiplomaRegistry, IssuingAuthority};
use isps_workflow::Formation;

use crate::error::AppError;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Bearer token for the authenticated router. `None` disables auth.
    pub auth_token: Option<String>,
    /// Display name of the diploma-issuing authority.
    pub authority_name: String,
    /// Ed25519 secret key for the issuing authority. `None` generates
    /// an ephemeral key (signatures will not survive a restart).
    pub authority_secret: Option<[u8; 32]>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            authority_name: "Autorité Portuaire — Direction de la Sûreté".to_string(),
            authority_secret: None,
        }
    }
}

impl AppConfig {
    /// Build configuration from `ISPS_*` environment variables.
    ///
    /// - `ISPS_PORT` — listen port (default 8080).
    /// - `ISPS_AUTH_TOKEN` — bearer token; unset disables auth.
    /// - `ISPS_AUTHORITY_NAME` — issuing authority display name.
    /// - `ISPS_AUTHORITY_KEY_HEX` — 64 hex chars of Ed25519 secret key;
    ///   unset generates an ephemeral key.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("ISPS_PORT") {
            config.port = port
                .parse()
                .map_err(|e| format!("invalid ISPS_PORT {port:?}: {e}"))?;
        }
        if let Ok(token) = std::env::var("ISPS_AUTH_TOKEN") {
            if !token.is_empty() {
                config.auth_token = Some(token);
            }
        }
        if let Ok(name) = std::env::var("ISPS_AUTHORITY_NAME") {
            if !name.trim().is_empty() {
                config.authority_name = name;
            }
        }
        if let Ok(hex) = std::env::var("ISPS_AUTHORITY_KEY_HEX") {
            config.authority_secret = Some(parse_key_hex(&hex)?);
        }

        Ok(config)
    }
}

/// Parse a 64-char hex string into 32 key bytes.
fn parse_key_hex(hex: &str) -> Result<[u8; 32], String> {
    if hex.len() != 64 {
        return Err(format!(
            "ISPS_AUTHORITY_KEY_HEX must be 64 hex characters, got {}",
            hex.len()
        ));
    }
    let mut bytes = [0u8; 32];
    for (i, chunk) in bytes.iter_mut().enumerate() {
        let pair = &hex[i * 2..i * 2 + 2];
        *chunk = u8::from_str_radix(pair, 16)
            .map_err(|e| format!("ISPS_AUTHORITY_KEY_HEX is not valid hex: {e}"))?;
    }
    Ok(bytes)
}

/// A stored formation with its optimistic-concurrency version.
#[derive(Debug, Clone)]
pub struct VersionedFormation {
    /// Monotonically increasing per-record version, bumped on every
    /// successful mutation.
    pub version: u64,
    /// The formation aggregate.
    pub formation: Formation,
}

/// The in-memory formation store.
///
/// Keyed by the formation UUID. Every mutation flows through
/// [`FormationStore::try_update`], which is the single place the
/// version check and the atomic-commit discipline live.
#[derive(Clone, Default)]
pub struct FormationStore {
    inner: Arc<RwLock<HashMap<Uuid, VersionedFormation>>>,
}

impl FormationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created formation at version 1.
    pub fn insert(&self, formation: Formation) -> u64 {
        let id = *formation.id.as_uuid();
        self.inner.write().insert(
            id,
            VersionedFormation {
                version: 1,
                formation,
            },
        );
        1
    }

    /// Fetch a snapshot of a formation and its version.
    pub fn get(&self, id: &Uuid) -> Option<VersionedFormation> {
        self.inner.read().get(id).cloned()
    }

    /// Snapshot all formations, oldest first.
    pub fn list(&self) -> Vec<VersionedFormation> {
        let mut all: Vec<VersionedFormation> = self.inner.read().values().cloned().collect();
        all.sort_by_key(|record| record.formation.created_at);
        all
    }

    /// Atomically read-validate-update a formation under the write lock.
    ///
    /// The closure receives a copy of the record and only a successful
    /// result is committed, so a rejected workflow action leaves the
    /// store untouched. When `expected_version` is supplied and stale,
    /// the caller gets a conflict and must refetch.
    pub fn try_update<T>(
        &self,
        id: &Uuid,
        expected_version: Option<u64>,
        mutate: impl FnOnce(&mut Formation) -> Result<T, AppError>,
    ) -> Result<(T, VersionedFormation), AppError> {
        let mut records = self.inner.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("formation {id} not found")))?;

        if let Some(expected) = expected_version {
            if expected != record.version {
                return Err(AppError::Conflict(format!(
                    "version mismatch: expected {expected}, current {} — refetch and retry",
                    record.version
                )));
            }
        }

        let mut candidate = record.formation.clone();
        let outcome = mutate(&mut candidate)?;

        record.formation = candidate;
        record.version += 1;
        Ok((outcome, record.clone()))
    }

    /// Delete a formation after the guard closure approves it.
    ///
    /// The guard runs under the write lock, so the delete decision and
    /// the removal are atomic with respect to concurrent transitions.
    pub fn try_delete(
        &self,
        id: &Uuid,
        guard: impl FnOnce(&Formation) -> Result<(), AppError>,
    ) -> Result<(), AppError> {
        let mut records = self.inner.write();
        let record = records
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("formation {id} not found")))?;
        guard(&record.formation)?;
        records.remove(id);
        Ok(())
    }

    /// Number of stored formations.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The formation store.
    pub formations: FormationStore,
    /// The system-wide diploma registry.
    pub registry: Arc<RwLock<DiplomaRegistry>>,
    /// The diploma-issuing authority key.
    pub authority: Arc<IssuingAuthority>,
    /// Service configuration.
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Development/test state: no auth, ephemeral authority key.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Build state from configuration.
    pub fn with_config(config: AppConfig) -> Self {
        let authority = match config.authority_secret {
            Some(secret) => IssuingAuthority::from_secret_bytes(&config.authority_name, secret),
            None => {
                tracing::warn!(
                    "no ISPS_AUTHORITY_KEY_HEX configured — using an ephemeral signing key; \
                     diploma signatures will not verify after a restart"
                );
                IssuingAuthority::generate(&config.authority_name)
            }
        };

        Self {
            formations: FormationStore::new(),
            registry: Arc::new(RwLock::new(DiplomaRegistry::new())),
            authority: Arc::new(authority),
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
