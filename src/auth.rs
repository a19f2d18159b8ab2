//! Credential management for outbound QWeather requests.
//!
//! The active scheme is chosen once from [`AuthConfig`]. Static keys are
//! returned as-is; signed tokens are minted with EdDSA, cached, and
//! re-minted once they come within [`TOKEN_SAFETY_MARGIN_SECS`] of expiry.

use std::fs;
use std::sync::{Arc, Mutex};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AuthConfig, PrivateKeySource};
use crate::constants::{API_KEY_HEADER, TOKEN_LIFETIME_SECS, TOKEN_SAFETY_MARGIN_SECS};
use crate::error::{Error, Result};

/// Source of the current UNIX time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A ready-to-send authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: HeaderName,
    pub value: HeaderValue,
}

impl AuthHeader {
    pub fn apply(self, request: RequestBuilder) -> RequestBuilder {
        request.header(self.name, self.value)
    }
}

/// Claims carried by a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl SignedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - TOKEN_SAFETY_MARGIN_SECS
    }
}

enum Scheme {
    ApiKey(AuthHeader),
    SignedToken(TokenSigner),
}

struct TokenSigner {
    project_id: String,
    key_id: String,
    key: EncodingKey,
    cached: Mutex<Option<SignedToken>>,
}

impl TokenSigner {
    fn sign(&self, now: i64) -> Result<SignedToken> {
        let claims = Claims {
            iss: self.key_id.clone(),
            sub: self.project_id.clone(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.key_id.clone());

        let token = encode(&header, &claims, &self.key)
            .map_err(|e| Error::config(format!("failed to sign token: {}", e)))?;

        Ok(SignedToken {
            token,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Produces the authorization header for every outbound call.
pub struct CredentialManager {
    scheme: Scheme,
    clock: Arc<dyn Clock>,
}

impl CredentialManager {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a manager reading time from `clock`.
    ///
    /// In signed-token mode the first token is minted here, so unreadable
    /// or malformed key material is reported at startup rather than on the
    /// first request.
    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let scheme = match config {
            AuthConfig::ApiKey(key) => {
                let mut value = HeaderValue::from_str(key)
                    .map_err(|_| Error::config("API key contains invalid header characters"))?;
                value.set_sensitive(true);
                info!("Using API key authentication");
                Scheme::ApiKey(AuthHeader {
                    name: HeaderName::from_static(API_KEY_HEADER),
                    value,
                })
            }
            AuthConfig::SignedToken {
                project_id,
                key_id,
                private_key,
            } => {
                let pem = read_private_key(private_key)?;
                let key = EncodingKey::from_ed_pem(pem.as_bytes())
                    .map_err(|e| Error::config(format!("invalid Ed25519 private key: {}", e)))?;

                let signer = TokenSigner {
                    project_id: project_id.clone(),
                    key_id: key_id.clone(),
                    key,
                    cached: Mutex::new(None),
                };
                let first = signer.sign(clock.now())?;
                *signer.cached.lock().unwrap_or_else(|e| e.into_inner()) = Some(first);

                info!(project_id = %project_id, key_id = %key_id, "Using signed token authentication");
                Scheme::SignedToken(signer)
            }
        };

        Ok(Self { scheme, clock })
    }

    /// Current header value, regenerating the signed token when needed.
    pub fn get_auth_header(&self) -> Result<AuthHeader> {
        match &self.scheme {
            Scheme::ApiKey(header) => Ok(header.clone()),
            Scheme::SignedToken(signer) => {
                let token = self.current_token(signer)?;
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token))
                    .map_err(|_| Error::config("signed token is not a valid header value"))?;
                value.set_sensitive(true);
                Ok(AuthHeader {
                    name: AUTHORIZATION,
                    value,
                })
            }
        }
    }

    /// The cached signed token, if this manager uses signed tokens.
    pub fn signed_token(&self) -> Option<SignedToken> {
        match &self.scheme {
            Scheme::ApiKey(_) => None,
            Scheme::SignedToken(signer) => signer
                .cached
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    fn current_token(&self, signer: &TokenSigner) -> Result<SignedToken> {
        let now = self.clock.now();
        let mut cached = signer.cached.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.clone());
        }

        let token = signer.sign(now)?;
        debug!(expires_at = token.expires_at, "Regenerated signed token");
        *cached = Some(token.clone());
        Ok(token)
    }
}

fn read_private_key(source: &PrivateKeySource) -> Result<String> {
    match source {
        PrivateKeySource::Path(path) => fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read private key {}: {}",
                path.display(),
                e
            ))
        }),
        PrivateKeySource::Inline(pem) => Ok(pem.replace("\\r\\n", "\n").replace("\\n", "\n")),
    }
}
