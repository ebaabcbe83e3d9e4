//! # podium-shared
//!
//! Domain vocabulary shared by the store and the HTTP server: typed row ids,
//! roles and post states, validated half-point ratings, the signed access
//! token format, and the authorization policy for post mutations.

pub mod constants;
pub mod error;
pub mod password;
pub mod policy;
pub mod rating;
pub mod token;
pub mod types;

pub use error::{ParseEnumError, PasswordError, RatingError, TokenError};
pub use rating::Rating;
pub use types::{Identity, MediaId, PostId, PostStatus, PostType, Role, UserId};
