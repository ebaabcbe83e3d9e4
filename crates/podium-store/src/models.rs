//! Domain model structs persisted in the SQLite database.
//!
//! Read-side structs derive `Serialize` with camelCase field names so the
//! HTTP layer can hand them straight to the SPA.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use podium_shared::constants::{LEGACY_POINTS_PER_VOTE, POINTS_PER_RATING_UNIT};
use podium_shared::{MediaId, PostId, PostStatus, PostType, Role, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.  The password hash never leaves the store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub student_id: Option<String>,
    /// Path of the avatar image in media storage.
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial profile update.  `None` leaves the column untouched; for the
/// nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub student_id: Option<Option<String>>,
    pub avatar: Option<Option<String>>,
    pub password_hash: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.student_id.is_none()
            && self.avatar.is_none()
            && self.password_hash.is_none()
    }
}

// ---------------------------------------------------------------------------
// Post / Media
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub status: PostStatus,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: MediaId,
    pub post_id: PostId,
    pub file_path: String,
}

/// Fields required to insert a post.  Media paths are kept in order.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: UserId,
    pub title: String,
    pub description: String,
    pub post_type: PostType,
    pub media: Vec<String>,
}

/// Partial post update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Listing filter.  `limit` is applied as given; callers clamp it.
#[derive(Debug, Clone, Copy)]
pub struct PostFilter {
    pub post_type: Option<PostType>,
    pub status: Option<PostStatus>,
    pub limit: u32,
}

/// A post as shown in listings: author, rating rollup, the viewer's own
/// rating and the attached media.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
    pub author_role: Role,
    /// Mean rating, one decimal; 0 without votes.
    pub avg_rating: f64,
    pub vote_count: i64,
    /// The viewer's own rating; 0 when absent or anonymous.
    pub user_rating: f64,
    pub has_voted: bool,
    /// File path of the first media row, or empty.
    pub thumbnail: String,
    pub media: Vec<Media>,
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// Aggregates returned after a rating is saved.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub avg_rating: f64,
    pub vote_count: i64,
    pub user_rating: f64,
}

// ---------------------------------------------------------------------------
// User votes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Voted,
    Unvoted,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub action: ToggleAction,
    /// Total votes the candidate now holds.
    pub votes: i64,
    pub has_voted: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteTallies {
    pub votes_by_candidate: BTreeMap<UserId, i64>,
    /// Candidates the viewer has voted for; empty when anonymous.
    pub my_votes: BTreeMap<UserId, bool>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// How vote activity converts into profile score points.
///
/// Both weightings are historical and undocumented; they are kept verbatim
/// rather than tuned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScheme {
    /// Votes carry a half-point star rating: `round(rating_sum * 2)`.
    HalfPointRatings,
    /// Votes are bare up-votes: `vote_count * 10`.
    LegacyVotes,
}

impl ScoreScheme {
    pub fn rating_points(&self, rating_sum: f64, vote_count: i64) -> i64 {
        match self {
            ScoreScheme::HalfPointRatings => (rating_sum * POINTS_PER_RATING_UNIT).round() as i64,
            ScoreScheme::LegacyVotes => vote_count * LEGACY_POINTS_PER_VOTE,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_score: i64,
    pub avg_rating: f64,
    pub video_submissions: i64,
    pub audio_submissions: i64,
    pub blog_submissions: i64,
    pub total_posts: i64,
    pub total_votes: i64,
    pub total_views: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: PostId,
    pub title: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: User,
    pub stats: ProfileStats,
    pub recent_activity: Vec<ActivityItem>,
}
