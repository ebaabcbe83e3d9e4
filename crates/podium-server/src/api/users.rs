use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::warn;
use validator::ValidateEmail;

use podium_shared::password::hash_password;
use podium_shared::policy::can_vote_for;
use podium_shared::UserId;
use podium_store::{Profile, ProfileChanges, StoreError, ToggleOutcome, VoteTallies};

use super::{present, ApiJson, AppState};
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::ApiError;

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .run_db(move |db| db.profile(identity.user_id).map_err(user_lookup))
        .await?;
    Ok(Json(profile))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    #[serde(default, deserialize_with = "present")]
    name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    email: Option<Option<String>>,
    #[serde(default, alias = "student_id", deserialize_with = "present")]
    student_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    avatar: Option<Option<String>>,
    #[serde(default)]
    password: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(req): ApiJson<ProfileUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ProfileUpdate {
        mut changes,
        password,
    } = profile_update(req)?;

    if let Some(password) = password {
        // Argon2 runs on the blocking pool, not an async worker.
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ApiError::Storage(format!("hashing task failed: {e}")))?
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        changes.password_hash = Some(hash);
    }

    let user = state
        .run_db(move |db| {
            db.update_profile(identity.user_id, &changes)
                .map_err(user_lookup)
        })
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Profile updated",
        "user": user,
    })))
}

/// A validated profile update.  The new password, if any, is still
/// plaintext and must be hashed before the change set is stored.
struct ProfileUpdate {
    changes: ProfileChanges,
    password: Option<String>,
}

fn profile_update(req: ProfileUpdateRequest) -> Result<ProfileUpdate, ApiError> {
    let mut changes = ProfileChanges::default();

    if let Some(name) = req.name {
        let name = name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("Name is required".into()));
        }
        changes.name = Some(name.to_string());
    }

    if let Some(email) = req.email {
        let email = email.as_deref().map(str::trim).unwrap_or_default();
        if !email.validate_email() {
            return Err(ApiError::InvalidInput("Valid email is required".into()));
        }
        changes.email = Some(email.to_string());
    }

    changes.student_id = req.student_id.map(blank_to_null);
    changes.avatar = req.avatar.map(blank_to_null);

    let password = req.password.filter(|p| !p.trim().is_empty());

    if changes.is_empty() && password.is_none() {
        return Err(ApiError::InvalidInput("No profile changes provided".into()));
    }
    Ok(ProfileUpdate { changes, password })
}

fn blank_to_null(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoteRequest {
    #[serde(alias = "candidate_id")]
    candidate_id: Option<UserId>,
}

pub async fn toggle_vote(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(req): ApiJson<UserVoteRequest>,
) -> Result<Json<ToggleOutcome>, ApiError> {
    let candidate = req
        .candidate_id
        .filter(UserId::is_valid)
        .ok_or_else(|| ApiError::InvalidInput("Invalid candidate ID".into()))?;

    if !can_vote_for(identity.user_id, candidate) {
        warn!(user_id = %identity.user_id, "self-vote rejected");
        return Err(ApiError::InvalidInput("You cannot vote for yourself".into()));
    }

    let outcome = state
        .run_db(move |db| {
            db.toggle_user_vote(identity.user_id, candidate)
                .map_err(user_lookup)
        })
        .await?;
    Ok(Json(outcome))
}

pub async fn list_votes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> Result<Json<VoteTallies>, ApiError> {
    let viewer = viewer.map(|identity| identity.user_id);
    let tallies = state
        .run_db(move |db| Ok(db.vote_tallies(viewer)?))
        .await?;
    Ok(Json(tallies))
}

fn user_lookup(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("User not found".into()),
        other => other.into(),
    }
}
