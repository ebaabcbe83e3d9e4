//! Bearer-token identity verification and the request extractors built on it.
//!
//! Tokens are minted by the external auth service and signed with its
//! Ed25519 key; the server only checks them.  Handlers never see the raw
//! header: they ask for a [`CurrentUser`] (required) or a [`MaybeUser`]
//! (optional) and receive a verified [`Identity`].

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use tracing::debug;

use podium_shared::token::verify_token;
use podium_shared::Identity;

use crate::api::AppState;
use crate::error::ApiError;

/// Turns a bearer credential into a verified identity, or nothing.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, bearer: &str) -> Option<Identity>;
}

/// Verifies signed access tokens against the issuer's public key.
#[derive(Clone)]
pub struct SignedTokenVerifier {
    issuer_pubkey: [u8; 32],
}

impl SignedTokenVerifier {
    pub fn new(issuer_pubkey: [u8; 32]) -> Self {
        Self { issuer_pubkey }
    }
}

impl IdentityVerifier for SignedTokenVerifier {
    fn verify(&self, bearer: &str) -> Option<Identity> {
        match verify_token(bearer, &self.issuer_pubkey) {
            Ok(claims) if claims.user_id.is_valid() => Some(claims.identity()),
            Ok(claims) => {
                debug!(user_id = %claims.user_id, "Token names an invalid user id");
                None
            }
            Err(e) => {
                debug!(error = %e, "Token verification failed");
                None
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn identify(parts: &Parts, state: &AppState) -> Option<Identity> {
    bearer_token(&parts.headers).and_then(|token| state.verifier.verify(token))
}

/// The authenticated caller.  Rejects with 401 when there is no valid token.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Identity);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        identify(parts, state)
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// The caller's identity when one was presented and verified.
///
/// A missing or invalid token yields `None`, never an error.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Identity>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(identify(parts, state)))
    }
}
