use rusqlite::params;

use podium_shared::rating::round1;
use podium_shared::{PostId, Rating, UserId};

use crate::database::{now_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::RatingStats;
use crate::posts::post_exists;

impl Database {
    /// Save `user`'s rating of `post`, replacing any earlier one, and return
    /// the post's fresh aggregates.
    ///
    /// The write and the read-back share one IMMEDIATE transaction: a failed
    /// write leaves nothing behind and skips the read-back.
    pub fn upsert_rating(
        &mut self,
        user_id: UserId,
        post_id: PostId,
        rating: Rating,
    ) -> Result<RatingStats> {
        let tx = self.begin_immediate()?;

        if !post_exists(&tx, post_id)? {
            return Err(StoreError::NotFound);
        }

        tx.execute(
            "INSERT INTO votes (user_id, post_id, rating, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, post_id) DO UPDATE SET rating = excluded.rating",
            params![user_id.0, post_id.0, rating.value(), now_timestamp()],
        )?;

        let (vote_count, avg_rating) = rating_totals(&tx, post_id)?;
        tx.commit()?;

        tracing::info!(
            post_id = %post_id,
            user_id = %user_id,
            rating = rating.value(),
            vote_count,
            "rating saved"
        );

        Ok(RatingStats {
            avg_rating: round1(avg_rating),
            vote_count,
            user_rating: rating.value(),
        })
    }

    /// Current vote count and mean rating of a post (mean unrounded).
    pub fn post_rating_totals(&self, post_id: PostId) -> Result<(i64, f64)> {
        rating_totals(self.conn(), post_id)
    }
}

fn rating_totals(conn: &rusqlite::Connection, post_id: PostId) -> Result<(i64, f64)> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(AVG(rating), 0) FROM votes WHERE post_id = ?1",
        params![post_id.0],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map_err(StoreError::from)
}
