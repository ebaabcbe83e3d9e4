use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_SEPARATOR;
use crate::error::TokenError;
use crate::types::{Identity, Role, UserId};

// Access token minted by the auth service, presented as `Authorization: Bearer`.
// Wire form: base64url(claims json) "." base64url(ed25519 signature over the json bytes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: UserId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

pub fn issue_token(claims: &TokenClaims, issuer_key: &SigningKey) -> String {
    // Serializing a struct of plain fields cannot fail.
    let payload = serde_json::to_vec(claims).unwrap_or_default();
    let signature = issuer_key.sign(&payload);

    format!(
        "{}{}{}",
        URL_SAFE_NO_PAD.encode(&payload),
        TOKEN_SEPARATOR,
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    )
}

pub fn verify_token(token: &str, issuer_pubkey: &[u8; 32]) -> Result<TokenClaims, TokenError> {
    verify_token_at(token, issuer_pubkey, Utc::now())
}

pub fn verify_token_at(
    token: &str,
    issuer_pubkey: &[u8; 32],
    now: DateTime<Utc>,
) -> Result<TokenClaims, TokenError> {
    let (payload_b64, signature_b64) = token
        .trim()
        .split_once(TOKEN_SEPARATOR)
        .ok_or(TokenError::Malformed)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| TokenError::Malformed)?;
    let signature_bytes = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Malformed)?;

    let verifying_key =
        VerifyingKey::from_bytes(issuer_pubkey).map_err(|_| TokenError::InvalidKey)?;
    let signature = Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Malformed)?;

    verifying_key
        .verify(&payload, &signature)
        .map_err(|_| TokenError::BadSignature)?;

    let claims: TokenClaims =
        serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

    if now > claims.expires_at {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}
