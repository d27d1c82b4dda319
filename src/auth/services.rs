pub(crate) use crate::auth::dto::{Claims, Identity, JwtKeys};
use crate::auth::repo::UserStore;
use crate::config::JwtConfig;
use crate::error::{AppResult, AuthError};
use crate::state::AppState;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

const SESSION_ALG: Algorithm = Algorithm::HS256;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes as u64) * 60),
        }
    }

    /// Mints a session token for `user_id` valid for the configured TTL.
    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(SESSION_ALG), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token issued");
        Ok(token)
    }

    /// Checks signature, algorithm, issuer, audience and expiry. The algorithm
    /// is pinned here, whatever the token header claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(SESSION_ALG);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    debug!(error = %e, "session token rejected");
                    AuthError::InvalidToken
                }
            })
    }
}

/// The session gate. Resolves a raw cookie value to the identity it binds,
/// or says why it cannot.
pub async fn verify_session(
    keys: &JwtKeys,
    users: &dyn UserStore,
    raw_token: Option<&str>,
) -> AppResult<Identity> {
    let token = raw_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::NoToken)?;

    let claims = keys.decode(token)?;

    if users.find_by_id(claims.user_id).await?.is_none() {
        return Err(AuthError::UserNotFound.into());
    }

    Ok(Identity {
        user_id: claims.user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryUserStore;
    use crate::error::{AppError, StoreError};
    use crate::auth::repo_types::User;
    use async_trait::async_trait;

    fn keys_with(secret: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    fn auth_err(res: AppResult<Identity>) -> AuthError {
        match res {
            Err(AppError::Auth(kind)) => kind,
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    async fn registered(store: &MemoryUserStore) -> Uuid {
        store.create("user@example.com", "hash").await.expect("create user").id
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email("a@nodot"));
    }

    #[test]
    fn issued_token_carries_identity_and_window() {
        let keys = keys_with("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("issue");
        let claims = keys.decode(&token).expect("decode");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[tokio::test]
    async fn valid_cookie_resolves_identity() {
        let store = MemoryUserStore::new();
        let user_id = registered(&store).await;
        let keys = keys_with("dev-secret");
        let token = keys.issue(user_id).expect("issue");

        let identity = verify_session(&keys, &store, Some(token.as_str())).await.expect("verify");
        assert_eq!(identity, Identity { user_id });
    }

    #[tokio::test]
    async fn missing_or_blank_cookie_is_no_token() {
        let store = MemoryUserStore::new();
        let keys = keys_with("dev-secret");
        assert_eq!(auth_err(verify_session(&keys, &store, None).await), AuthError::NoToken);
        assert_eq!(auth_err(verify_session(&keys, &store, Some("  ")).await), AuthError::NoToken);
    }

    #[tokio::test]
    async fn flipped_signature_byte_is_invalid() {
        let store = MemoryUserStore::new();
        let user_id = registered(&store).await;
        let keys = keys_with("dev-secret");
        let token = keys.issue(user_id).expect("issue");

        let mut bytes = token.into_bytes();
        let last = bytes.len() - 2;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).expect("ascii");

        assert_eq!(
            auth_err(verify_session(&keys, &store, Some(tampered.as_str())).await),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn token_from_another_key_is_invalid() {
        let store = MemoryUserStore::new();
        let user_id = registered(&store).await;
        let foreign = keys_with("someone-else").issue(user_id).expect("issue");
        assert_eq!(
            auth_err(verify_session(&keys_with("dev-secret"), &store, Some(foreign.as_str())).await),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn header_algorithm_is_not_trusted() {
        let store = MemoryUserStore::new();
        let user_id = registered(&store).await;
        let keys = keys_with("dev-secret");
        let token = keys.issue(user_id).expect("issue");
        let payload = token.split('.').nth(1).expect("payload segment");

        // {"alg":"none","typ":"JWT"}
        let unsigned = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{payload}.");
        assert_eq!(
            auth_err(verify_session(&keys, &store, Some(unsigned.as_str())).await),
            AuthError::InvalidToken
        );

        let claims = keys.decode(&token).expect("decode");
        let hs512 = encode(&Header::new(Algorithm::HS512), &claims, &keys.encoding).expect("encode");
        assert_eq!(
            auth_err(verify_session(&keys, &store, Some(hs512.as_str())).await),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn wrong_issuer_or_audience_is_invalid() {
        let store = MemoryUserStore::new();
        let user_id = registered(&store).await;
        let good = keys_with("same-secret");
        let mut other = keys_with("same-secret");
        other.issuer = "elsewhere".into();
        let token = other.issue(user_id).expect("issue");
        assert_eq!(
            auth_err(verify_session(&good, &store, Some(token.as_str())).await),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let store = MemoryUserStore::new();
        let user_id = registered(&store).await;
        let keys = keys_with("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            user_id,
            iat: now - 600,
            exp: now - 10,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::new(SESSION_ALG), &claims, &keys.encoding).expect("encode");
        assert_eq!(
            auth_err(verify_session(&keys, &store, Some(token.as_str())).await),
            AuthError::Expired
        );
    }

    #[tokio::test]
    async fn deleted_user_with_live_token_is_rejected() {
        let store = MemoryUserStore::new();
        let user_id = registered(&store).await;
        let keys = keys_with("dev-secret");
        let token = keys.issue(user_id).expect("issue");
        store.remove(user_id).await;
        assert_eq!(
            auth_err(verify_session(&keys, &store, Some(token.as_str())).await),
            AuthError::UserNotFound
        );
    }

    struct DownStore;

    #[async_trait]
    impl UserStore for DownStore {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
            Err(StoreError::ConnectionFailure("connection refused".into()))
        }
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::ConnectionFailure("connection refused".into()))
        }
        async fn create(&self, _email: &str, _hash: &str) -> Result<User, StoreError> {
            Err(StoreError::ConnectionFailure("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_outage_is_not_an_auth_verdict() {
        let keys = keys_with("dev-secret");
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        let res = verify_session(&keys, &DownStore, Some(token.as_str())).await;
        assert!(matches!(res, Err(AppError::Store(StoreError::ConnectionFailure(_)))));
    }
}
