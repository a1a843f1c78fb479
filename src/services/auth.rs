use crate::error::{AppResult, AuthError, DomainError};
use crate::models::account::Account;
use crate::models::types::AccountId;
use crate::services::AccountService;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Decimal account id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Seconds until the token stops resolving
    pub expires_in: u64,
}

/// Stateless bearer tokens: HMAC-SHA256 signed, JWT compact form.
pub struct AuthService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl AuthService {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, account_id: AccountId) -> AppResult<IssuedToken> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).map_err(|_| DomainError::Internal("token ttl out of range".into()))?;
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        let header = Header {
            alg: ALGORITHM.into(),
            typ: TOKEN_TYPE.into(),
        };
        let header = serde_json::to_vec(&header).map_err(|e| DomainError::Internal(e.to_string()))?;
        let claims = serde_json::to_vec(&claims).map_err(|e| DomainError::Internal(e.to_string()))?;

        let signing_input = format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims));
        let signature = self.mac(&signing_input)?.finalize().into_bytes();

        Ok(IssuedToken {
            token: format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)),
            expires_in: self.ttl.as_secs(),
        })
    }

    /// Checks structure, algorithm, signature and expiry, in that order.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM || header.typ != TOKEN_TYPE {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| AuthError::Malformed)?;
        let signing_len = header_b64.len() + 1 + claims_b64.len();
        let mac = self.mac(&token[..signing_len]).map_err(|_| AuthError::BadSignature)?;
        mac.verify_slice(&signature).map_err(|_| AuthError::BadSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Password check followed by token issuance. A wrong password and an
    /// unknown username both come back as `Unauthenticated`.
    pub async fn login(&self, accounts: &AccountService, username: &str, password: &str) -> AppResult<IssuedToken> {
        let account = accounts
            .verify(username, password)
            .await?
            .ok_or(DomainError::Unauthenticated)?;

        let issued = self.issue(account.id)?;
        tracing::info!(account_id = %account.id, "login");
        Ok(issued)
    }

    /// Resolves a bearer token to a live account. Every failure collapses
    /// into `Unauthenticated`; the reason is only logged.
    pub async fn resolve(&self, token: &str, accounts: &AccountService) -> AppResult<Account> {
        let account_id = self
            .decode(token)
            .and_then(|c| c.sub.parse::<AccountId>().map_err(|_| AuthError::Malformed))
            .map_err(|reason| {
                tracing::warn!(%reason, "bearer token rejected");
                DomainError::Unauthenticated
            })?;

        match accounts.find_by_id(account_id).await? {
            Some(account) => Ok(account),
            None => {
                tracing::warn!(reason = %AuthError::UnknownAccount, %account_id, "bearer token rejected");
                Err(AuthError::UnknownAccount.into())
            }
        }
    }

    fn mac(&self, signing_input: &str) -> AppResult<HmacSha256> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|e| DomainError::Internal(format!("signing key: {e}")))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|_| AuthError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthService {
        AuthService::new("test-secret", Duration::from_secs(60))
    }

    #[test]
    fn issued_token_decodes_to_its_subject() {
        let auth = auth();
        let issued = auth.issue(AccountId(42)).unwrap();
        assert_eq!(issued.expires_in, 60);
        assert_eq!(issued.token.split('.').count(), 3);

        let claims = auth.decode(&issued.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let auth = auth();
        let token = auth.issue(AccountId(1)).unwrap().token;
        let (rest, sig) = token.rsplit_once('.').unwrap();
        let first = if sig.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{rest}.{first}{}", &sig[1..]);
        assert_eq!(auth.decode(&tampered), Err(AuthError::BadSignature));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let auth = auth();
        let token = auth.issue(AccountId(1)).unwrap().token;
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"2","iat":0,"exp":99999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(auth.decode(&forged), Err(AuthError::BadSignature));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = auth().issue(AccountId(1)).unwrap().token;
        let other = AuthService::new("another-secret", Duration::from_secs(60));
        assert_eq!(other.decode(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = AuthService::new("test-secret", Duration::ZERO);
        let token = auth.issue(AccountId(1)).unwrap().token;
        assert_eq!(auth.decode(&token), Err(AuthError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        let auth = auth();
        assert_eq!(auth.decode(""), Err(AuthError::Malformed));
        assert_eq!(auth.decode("abc"), Err(AuthError::Malformed));
        assert_eq!(auth.decode("a.b.c.d"), Err(AuthError::Malformed));
        assert_eq!(auth.decode("!!.??.**"), Err(AuthError::Malformed));
    }

    #[test]
    fn unsigned_algorithm_is_refused() {
        let auth = auth();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":"1","iat":0,"exp":99999999999}"#);
        let token = format!("{header}.{claims}.");
        assert_eq!(auth.decode(&token), Err(AuthError::UnsupportedAlgorithm));
    }
}
