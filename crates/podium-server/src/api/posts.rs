use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use podium_shared::constants::DEFAULT_LIST_LIMIT;
use podium_shared::policy::can_mutate_post;
use podium_shared::{Identity, PostId, PostStatus, PostType, Rating};
use podium_store::{
    Database, NewPost, Post, PostChanges, PostFilter, PostSummary, RatingStats, StoreError,
};

use super::{present, ApiJson, AppState};
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::ApiError;

// ─── Listing ───

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    post_type: Option<String>,
    status: Option<String>,
    limit: Option<String>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PostSummary>>, ApiError> {
    let filter = PostFilter {
        post_type: parse_filter(query.post_type.as_deref(), "type")?,
        status: parse_filter(query.status.as_deref(), "status")?,
        limit: parse_limit(query.limit.as_deref(), state.config.max_list_limit)?,
    };
    let viewer = viewer.map(|identity| identity.user_id);

    let posts = state
        .run_db(move |db| Ok(db.list_posts(&filter, viewer)?))
        .await?;
    Ok(Json(posts))
}

fn parse_filter<T: FromStr>(raw: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::InvalidInput(format!("Invalid {name} filter: {value}"))),
    }
}

/// Absent means the default page size; anything given is clamped into
/// `[1, max]`.
pub(crate) fn parse_limit(raw: Option<&str>, max: u32) -> Result<u32, ApiError> {
    let requested = match raw.map(str::trim) {
        None | Some("") => i64::from(DEFAULT_LIST_LIMIT),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| ApiError::InvalidInput("limit must be an integer".into()))?,
    };
    let clamped = requested.clamp(1, i64::from(max.max(1)));
    Ok(clamped as u32)
}

// ─── Create ───

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type")]
    post_type: Option<String>,
    #[serde(default)]
    media: Vec<String>,
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let title = required_title(req.title.as_deref())?;
    let post_type = req
        .post_type
        .as_deref()
        .map(str::trim)
        .and_then(|raw| PostType::from_str(raw).ok())
        .ok_or_else(|| ApiError::InvalidInput("type must be video, audio or blog".into()))?;

    let new_post = NewPost {
        author_id: identity.user_id,
        title,
        description: req.description.unwrap_or_default(),
        post_type,
        media: req
            .media
            .into_iter()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect(),
    };

    let post = state.run_db(move |db| Ok(db.create_post(&new_post)?)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

fn required_title(raw: Option<&str>) -> Result<String, ApiError> {
    let title = raw.unwrap_or_default().trim();
    if title.is_empty() {
        return Err(ApiError::InvalidInput("Title is required".into()));
    }
    Ok(title.to_string())
}

// ─── Update / status / delete ───

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    id: Option<PostId>,
    #[serde(default, deserialize_with = "present")]
    title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    description: Option<Option<String>>,
}

pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = valid_post_id(req.id, "Invalid ID")?;

    let mut changes = PostChanges::default();
    if let Some(title) = req.title {
        changes.title = Some(required_title(title.as_deref())?);
    }
    if let Some(description) = req.description {
        changes.description = Some(description.unwrap_or_default());
    }
    if changes.is_empty() {
        return Err(ApiError::InvalidInput("No fields to update".into()));
    }

    let post = state
        .run_db(move |db| {
            authorize_post_mutation(db, &identity, id)?;
            Ok(db.update_post(id, &changes)?)
        })
        .await?;

    info!(post_id = %id, user_id = %identity.user_id, "post updated");
    Ok(Json(serde_json::json!({
        "message": "Post updated successfully",
        "post": post,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    id: Option<PostId>,
    status: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = valid_post_id(req.id, "Invalid ID")?;
    let status = req
        .status
        .as_deref()
        .map(str::trim)
        .and_then(|raw| PostStatus::from_str(raw).ok())
        .ok_or_else(|| {
            ApiError::InvalidInput("status must be pending, approved or rejected".into())
        })?;

    let post = state
        .run_db(move |db| {
            authorize_post_mutation(db, &identity, id)?;
            Ok(db.set_post_status(id, status)?)
        })
        .await?;

    info!(post_id = %id, user_id = %identity.user_id, status = %status, "post status changed");
    Ok(Json(serde_json::json!({
        "message": "Status updated",
        "post": post,
    })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = raw_id
        .trim()
        .parse::<i64>()
        .ok()
        .map(PostId)
        .filter(PostId::is_valid)
        .ok_or_else(|| ApiError::InvalidInput("Invalid ID".into()))?;

    let deleted = state
        .run_db(move |db| {
            authorize_post_mutation(db, &identity, id)?;
            Ok(db.delete_post(id)?)
        })
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    info!(post_id = %id, user_id = %identity.user_id, "post deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Owner or admin; anyone else is refused before the row is touched.
fn authorize_post_mutation(db: &Database, identity: &Identity, id: PostId) -> Result<(), ApiError> {
    let author = db.post_author(id).map_err(post_lookup)?;
    if !can_mutate_post(identity, author) {
        warn!(
            post_id = %id,
            user_id = %identity.user_id,
            role = %identity.role,
            "post mutation denied"
        );
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

fn post_lookup(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("Post not found".into()),
        other => other.into(),
    }
}

fn valid_post_id(id: Option<PostId>, message: &str) -> Result<PostId, ApiError> {
    id.filter(PostId::is_valid)
        .ok_or_else(|| ApiError::InvalidInput(message.to_string()))
}

// ─── Views ───

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRequest {
    #[serde(alias = "post_id", alias = "id")]
    post_id: Option<PostId>,
}

pub async fn increment_views(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ViewRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = valid_post_id(req.post_id, "Invalid post ID")?;
    let views = state
        .run_db(move |db| db.increment_views(id).map_err(post_lookup))
        .await?;
    Ok(Json(serde_json::json!({ "views": views })))
}

// ─── Ratings ───

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    #[serde(alias = "post_id")]
    post_id: Option<PostId>,
    rating: Option<f64>,
}

pub async fn submit_rating(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(req): ApiJson<RatingRequest>,
) -> Result<Json<RatingStats>, ApiError> {
    let post_id = valid_post_id(req.post_id, "Invalid post ID")?;
    let rating = Rating::from_input(req.rating)?;

    let stats = state
        .run_db(move |db| {
            db.upsert_rating(identity.user_id, post_id, rating)
                .map_err(post_lookup)
        })
        .await?;
    Ok(Json(stats))
}
