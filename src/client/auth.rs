//! Bearer token providers
//!
//! A service account key is exchanged for a short-lived access token through
//! the OAuth 2.0 JWT bearer grant. Tokens are cached until shortly before they
//! expire. A pre-issued token can be used instead when no key file is
//! available.

use super::{ClientError, ClientResult};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Read-only scope for the Search Console API
pub const SEARCH_CONSOLE_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/webmasters.readonly";

/// Default OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Refresh the cached token this long before it expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of OAuth bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid access token
    async fn access_token(&self) -> ClientResult<SecretString>;
}

/// Provider that always returns the same pre-issued token
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    /// Wrap a pre-issued access token
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> ClientResult<SecretString> {
        Ok(self.token.clone())
    }
}

/// Fields of a service account key file used for the JWT exchange
#[derive(Deserialize)]
pub struct ServiceAccountKey {
    /// Account email, used as JWT issuer
    pub client_email: String,
    /// PEM-encoded RSA private key
    #[serde(deserialize_with = "deserialize_secret")]
    private_key: SecretString,
    /// Key identifier placed in the JWT header
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint named by the key file
    #[serde(default)]
    pub token_uri: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Load a key from a JSON key file
    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Auth(format!(
                "Failed to read service account file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a key from its JSON representation
    pub fn from_json(contents: &str) -> ClientResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| ClientError::Auth(format!("Invalid service account key: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

/// Provider exchanging a signed service account assertion for access tokens
pub struct ServiceAccountTokenProvider {
    client_email: String,
    key_id: Option<String>,
    encoding_key: EncodingKey,
    token_url: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    /// Create a provider from a parsed key
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> ClientResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
            .map_err(|e| ClientError::Auth(format!("Invalid service account private key: {}", e)))?;

        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            encoding_key,
            token_url: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            http,
            cached: Mutex::new(None),
        })
    }

    /// Override the token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Account email this provider authenticates as
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    fn signed_assertion(&self) -> ClientResult<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClientError::Auth(format!("System clock error: {}", e)))?
            .as_secs();

        let claims = Claims {
            iss: &self.client_email,
            scope: SEARCH_CONSOLE_READONLY_SCOPE,
            aud: &self.token_url,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| ClientError::Auth(format!("Failed to sign assertion: {}", e)))
    }

    async fn exchange(&self) -> ClientResult<CachedToken> {
        let assertion = self.signed_assertion()?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        debug!(token_url = %self.token_url, "Requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read token response: {}", e)))?;

        if status.is_server_error() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: format!("Token endpoint error: {}", body),
            });
        }

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(ClientError::Auth(format!(
                "Token exchange rejected ({}): {}",
                status, message
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::Parse(format!("Invalid token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        info!(account = %self.client_email, "Obtained access token");

        Ok(CachedToken {
            token: SecretString::from(token.access_token),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> ClientResult<SecretString> {
        let mut cached = self.cached.lock().await;

        if let Some(current) = cached.as_ref() {
            if Instant::now() < current.expires_at {
                return Ok(current.token.clone());
            }
            debug!("Cached access token expired");
        }

        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
