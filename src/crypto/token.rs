//! Signed, time-limited bearer tokens.
//!
//! Compact JWT layout (`header.claims.signature`, base64url, HS256) so the
//! browser client can read the claims. Verification checks the signature
//! in constant time before looking at the claims.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;
use zeroize::Zeroize;

use super::CryptoError;
use crate::models::Role;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Identity carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// HMAC signing key, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct SigningKey {
    bytes: Vec<u8>,
}

pub struct TokenSigner {
    key: SigningKey,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Result<Self, CryptoError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(CryptoError::InvalidKey(format!(
                "secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        Ok(Self {
            key: SigningKey {
                bytes: secret.to_vec(),
            },
            ttl_secs,
        })
    }

    /// Signer with a random per-process secret. Tokens die with the process.
    pub fn random(ttl_secs: i64) -> Self {
        let secret: [u8; 32] = rand::random();
        Self {
            key: SigningKey {
                bytes: secret.to_vec(),
            },
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token valid from `now` (unix seconds) for the configured TTL.
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
        now: i64,
    ) -> Result<IssuedToken, CryptoError> {
        let claims = TokenClaims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now,
            exp: now.checked_add(self.ttl_secs).ok_or(CryptoError::InvalidTtl)?,
            jti: Uuid::new_v4().to_string(),
        };
        let header = TokenHeader {
            alg: "HS256".into(),
            typ: "JWT".into(),
        };
        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = self.mac(&message)?.finalize().into_bytes();
        Ok(IssuedToken {
            token: format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature)),
            expires_in: self.ttl_secs,
        })
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str, now: i64) -> Result<TokenClaims, CryptoError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::MalformedToken);
        };
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CryptoError::MalformedToken)?;

        let mut mac = self.mac(header)?;
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CryptoError::BadSignature)?;

        let claims = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| CryptoError::MalformedToken)?;
        let claims: TokenClaims =
            serde_json::from_slice(&claims).map_err(|_| CryptoError::MalformedToken)?;
        if claims.exp <= now {
            return Err(CryptoError::TokenExpired);
        }
        Ok(claims)
    }

    fn mac(&self, message: &str) -> Result<HmacSha256, CryptoError> {
        let mut mac = HmacSha256::new_from_slice(&self.key.bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn signer() -> TokenSigner {
        TokenSigner::new(&[7u8; 32], 3600).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let s = signer();
        let issued = s.issue(5, "staff1", Role::Staff, NOW).unwrap();
        assert_eq!(issued.expires_in, 3600);
        let claims = s.verify(&issued.token, NOW + 10).unwrap();
        assert_eq!(claims.sub, 5);
        assert_eq!(claims.username, "staff1");
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.exp, NOW + 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let s = signer();
        let issued = s.issue(5, "staff1", Role::Staff, NOW).unwrap();
        assert!(matches!(
            s.verify(&issued.token, NOW + 3600),
            Err(CryptoError::TokenExpired)
        ));
    }

    #[test]
    fn tampered_claims_fail_signature() {
        let s = signer();
        let issued = s.issue(5, "staff1", Role::Staff, NOW).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&TokenClaims {
                sub: 5,
                username: "staff1".into(),
                role: Role::Admin,
                iat: NOW,
                exp: NOW + 3600,
                jti: "x".into(),
            })
            .unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert!(matches!(s.verify(&forged, NOW), Err(CryptoError::BadSignature)));
    }

    #[test]
    fn other_key_fails_signature() {
        let issued = signer().issue(1, "admin", Role::Admin, NOW).unwrap();
        let other = TokenSigner::new(&[9u8; 32], 3600).unwrap();
        assert!(matches!(other.verify(&issued.token, NOW), Err(CryptoError::BadSignature)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(signer().verify("abc", NOW), Err(CryptoError::MalformedToken)));
        assert!(matches!(signer().verify("a.b.c.d", NOW), Err(CryptoError::MalformedToken)));
    }

    #[test]
    fn overflowing_lifetime_is_an_error() {
        let s = TokenSigner::new(&[7u8; 32], i64::MAX).unwrap();
        assert!(matches!(
            s.issue(1, "admin", Role::Admin, NOW),
            Err(CryptoError::InvalidTtl)
        ));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(TokenSigner::new(b"short", 60).is_err());
    }

    #[test]
    fn each_token_has_unique_id() {
        let s = signer();
        let a = s.verify(&s.issue(1, "a", Role::Admin, NOW).unwrap().token, NOW).unwrap();
        let b = s.verify(&s.issue(1, "a", Role::Admin, NOW).unwrap().token, NOW).unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
