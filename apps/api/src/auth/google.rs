use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::{AuthError, TokenVerifier};

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
/// How long fetched signing keys are trusted before refetching.
const KEYS_TTL: Duration = Duration::from_secs(60 * 60);
/// Unknown key ids do not trigger another fetch within this window.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    email: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Google-issued ID tokens against Google's published signing keys.
pub struct GoogleTokenVerifier {
    client: Client,
    client_id: String,
    certs_url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: String) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| AuthError::Provider(e.to_string()))?,
            client_id,
            certs_url: GOOGLE_CERTS_URL.to_string(),
            cache: RwLock::new(None),
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation
    }

    /// Returns the decoding key for `kid`, refreshing the key set when it is
    /// stale or does not know `kid`. A `kid` still unknown after a recent
    /// fetch is rejected without going back to the network.
    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < KEYS_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk)
                            .map_err(|e| AuthError::InvalidToken(e.to_string()));
                    }
                    if age < MIN_REFETCH_INTERVAL {
                        return Err(AuthError::InvalidToken(format!(
                            "unknown signing key {kid}"
                        )));
                    }
                }
            }
        }

        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key {kid}")))
            .and_then(|jwk| {
                DecodingKey::from_jwk(jwk).map_err(|e| AuthError::InvalidToken(e.to_string()))
            });

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        debug!("Fetching identity provider signing keys");
        self.client
            .get(&self.certs_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for GoogleTokenVerifier {
    async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no key id".to_string()))?;

        let key = self.key_for(&kid).await?;
        let data = decode::<GoogleClaims>(token, &key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        data.claims.email.ok_or(AuthError::MissingEmail)
    }
}
