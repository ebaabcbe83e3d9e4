/// Application name
pub const APP_NAME: &str = "Podium";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Number of posts returned by the listing when the client gives no limit
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Hard ceiling on the listing limit unless the operator overrides it
pub const MAX_LIST_LIMIT: u32 = 200;

/// Number of posts shown in a profile's recent activity
pub const RECENT_ACTIVITY_LIMIT: u32 = 8;

/// Lowest accepted rating
pub const RATING_MIN: f64 = 0.5;

/// Highest accepted rating
pub const RATING_MAX: f64 = 5.0;

/// Allowed distance of `rating * 2` from an integer
pub const RATING_STEP_TOLERANCE: f64 = 0.001;

/// Score points per rating unit once ratings are half-point stars.
/// Historical weighting, pending product-owner review.
pub const POINTS_PER_RATING_UNIT: f64 = 2.0;

/// Score points per vote under the legacy up-vote scheme.
/// Historical weighting, pending product-owner review.
pub const LEGACY_POINTS_PER_VOTE: i64 = 10;

/// Separator between the claims and signature halves of an access token
pub const TOKEN_SEPARATOR: char = '.';
