//! Half-point star ratings.
//!
//! A [`Rating`] can only be built through [`Rating::new`], which enforces the
//! `[0.5, 5.0]` range and the 0.5 step, then snaps the value to the exact
//! half point so floating-point noise from the client never reaches storage.

use serde::Serialize;

use crate::constants::{RATING_MAX, RATING_MIN, RATING_STEP_TOLERANCE};
use crate::error::RatingError;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    pub fn new(value: f64) -> Result<Self, RatingError> {
        if !value.is_finite() {
            return Err(RatingError::NotFinite);
        }
        if value < RATING_MIN || value > RATING_MAX {
            return Err(RatingError::OutOfRange(value));
        }

        let scaled = value * 2.0;
        if (scaled - scaled.round()).abs() > RATING_STEP_TOLERANCE {
            return Err(RatingError::NotHalfStep(value));
        }

        Ok(Self(scaled.round() / 2.0))
    }

    /// Validate an optional client value; `None` means the field was absent.
    pub fn from_input(value: Option<f64>) -> Result<Self, RatingError> {
        value.ok_or(RatingError::Missing).and_then(Self::new)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Round to one decimal place, the precision every aggregate is reported at.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
