//! Session tokens
//!
//! HMAC-signed tokens issued by the external auth layer.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Authenticated identity carried by a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// User id as known to the profile subsystem
    pub user_id: String,
    /// Display name, informational only
    pub display_name: Option<String>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Session for `user_id` valid for `max_age_secs` from now
    pub fn new(user_id: impl Into<String>, display_name: Option<String>, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            display_name,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

type HmacSha256 = hmac::Hmac<sha2::Sha256>;

fn signer(secret: &str) -> Result<HmacSha256, AppError> {
    use hmac::Mac;

    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session secret: {e}")))
}

/// Create a signed session token
///
/// Token format: base64url(payload).base64url(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = signer(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// `Unauthenticated` if the token is malformed, forged or expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthenticated)?;

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthenticated)?;

    let mut mac = signer(secret)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthenticated)?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthenticated)?;
    let session: Session =
        serde_json::from_slice(&payload).map_err(|_| AppError::Unauthenticated)?;

    if session.is_expired() {
        return Err(AppError::Unauthenticated);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

    #[test]
    fn token_roundtrip_preserves_identity() {
        let session = Session::new("01HZUSER", Some("Ada".to_string()), 3600);
        let token = create_session_token(&session, SECRET).unwrap();

        let verified = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(verified, session);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_session_token(&Session::new("u1", None, 3600), SECRET).unwrap();

        let result = verify_session_token(&token, "another-secret-that-is-32-bytes-long!!");
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        use base64::{Engine as _, engine::general_purpose};

        let token = create_session_token(&Session::new("u1", None, 3600), SECRET).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_payload = serde_json::to_string(&Session::new("u2", None, 3600)).unwrap();
        let forged = format!(
            "{}.{}",
            general_purpose::URL_SAFE_NO_PAD.encode(forged_payload),
            signature
        );

        assert!(matches!(
            verify_session_token(&forged, SECRET),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn expired_and_malformed_tokens_are_rejected() {
        let expired = create_session_token(&Session::new("u1", None, -10), SECRET).unwrap();
        assert!(matches!(
            verify_session_token(&expired, SECRET),
            Err(AppError::Unauthenticated)
        ));

        for token in ["", "no-dot", "a.b.c", "!!!.???"] {
            assert!(
                matches!(
                    verify_session_token(token, SECRET),
                    Err(AppError::Unauthenticated)
                ),
                "accepted {token:?}"
            );
        }
    }
}
