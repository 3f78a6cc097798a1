use std::path::{Path, PathBuf};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::status_tracker::{Clock, SystemClock};

pub trait CredentialIssuer: Send + Sync + 'static {
    fn issue(&self) -> Result<String, CredentialError>;
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read key id from {path}: {source}")]
    ReadKeyId {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("key id is empty")]
    EmptyKeyId,
    #[error("failed to read private key from {path}: {source}")]
    ReadPrivateKey {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid ES256 private key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign provider token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Claims of an APNs provider token. APNs rejects tokens older than an hour
/// based on `iat`, so no `exp` is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderClaims {
    pub iss: String,
    pub iat: i64,
}

pub fn sign_provider_token(
    key_id: &str,
    private_key_pem: &[u8],
    team_id: &str,
    issued_at: i64,
) -> Result<String, CredentialError> {
    let key_id = key_id.trim();
    if key_id.is_empty() {
        return Err(CredentialError::EmptyKeyId);
    }

    let key = EncodingKey::from_ec_pem(private_key_pem).map_err(CredentialError::InvalidKey)?;

    let mut header = Header::new(Algorithm::ES256);
    header.typ = None;
    header.kid = Some(key_id.to_string());

    let claims = ProviderClaims {
        iss: team_id.to_string(),
        iat: issued_at,
    };

    encode(&header, &claims, &key).map_err(CredentialError::Signing)
}

/// Reads the key id and PKCS#8 private key from disk on every issuance.
#[derive(Debug, Clone)]
pub struct FileCredentialIssuer<Cl = SystemClock> {
    key_id_path: PathBuf,
    private_key_path: PathBuf,
    team_id: String,
    clock: Cl,
}

impl FileCredentialIssuer<SystemClock> {
    pub fn new(
        key_id_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
        team_id: impl Into<String>,
    ) -> Self {
        Self::with_clock(key_id_path, private_key_path, team_id, SystemClock)
    }
}

impl<Cl: Clock> FileCredentialIssuer<Cl> {
    pub fn with_clock(
        key_id_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
        team_id: impl Into<String>,
        clock: Cl,
    ) -> Self {
        Self {
            key_id_path: key_id_path.into(),
            private_key_path: private_key_path.into(),
            team_id: team_id.into(),
            clock,
        }
    }
}

impl<Cl: Clock> CredentialIssuer for FileCredentialIssuer<Cl> {
    fn issue(&self) -> Result<String, CredentialError> {
        let key_id = std::fs::read_to_string(&self.key_id_path).map_err(|source| {
            CredentialError::ReadKeyId {
                path: display_path(&self.key_id_path),
                source,
            }
        })?;
        let private_key = std::fs::read(&self.private_key_path).map_err(|source| {
            CredentialError::ReadPrivateKey {
                path: display_path(&self.private_key_path),
                source,
            }
        })?;

        sign_provider_token(
            &key_id,
            &private_key,
            &self.team_id,
            self.clock.now().timestamp(),
        )
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
