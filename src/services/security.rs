use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::CONFIG;
use crate::error::Result;

// Session token lifetime (in seconds)
const SESSION_TOKEN_EXPIRE: i64 = 43_200; // 12 hours

/// Claims carried by a staff session token. Tokens are minted by the
/// external identity provider with the same shared secret; this crate
/// only verifies and reads them.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Opaque staff account identifier.
    pub sub: String,
    /// Branch the session is scoped to. Absent means the configured
    /// default branch applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
}

/// Create a session token. Used by tooling and tests; production tokens
/// come from the identity provider.
pub fn create_session_token(actor: &str, branch_id: Option<i64>, is_admin: bool) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: actor.to_string(),
        branch_id,
        is_admin,
        exp: now + SESSION_TOKEN_EXPIRE,
        iat: now,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(CONFIG.session_secret.as_bytes()),
    )?;
    Ok(token)
}

/// Decode and validate a session token
pub fn decode_session_token(token: &str) -> Result<SessionClaims> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(CONFIG.session_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_round_trip() {
        let token = create_session_token("staff-17", Some(3), false).unwrap();
        let claims = decode_session_token(&token).unwrap();

        assert_eq!(claims.sub, "staff-17");
        assert_eq!(claims.branch_id, Some(3));
        assert!(!claims.is_admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_session_token_without_branch() {
        let token = create_session_token("staff-1", None, true).unwrap();
        let claims = decode_session_token(&token).unwrap();

        assert_eq!(claims.branch_id, None);
        assert!(claims.is_admin);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = create_session_token("staff-1", Some(1), false).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('a') { 'b' } else { 'a' });

        assert!(decode_session_token(&tampered).is_err());
    }

    #[test]
    fn test_is_admin_defaults_to_false() {
        // Claims minted by older identity-provider versions omit is_admin.
        let json = r#"{"sub": "staff-9", "exp": 9999999999, "iat": 0}"#;
        let claims: SessionClaims = serde_json::from_str(json).unwrap();
        assert!(!claims.is_admin);
        assert!(claims.branch_id.is_none());
    }
}
