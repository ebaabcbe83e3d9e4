use rusqlite::{params, OptionalExtension};

use podium_shared::UserId;

use crate::database::{now_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{ToggleAction, ToggleOutcome, VoteTallies};

impl Database {
    /// Flip `voter`'s vote for `candidate`: remove it when present, cast it
    /// otherwise.
    ///
    /// The delete-or-insert pair runs under an IMMEDIATE transaction, so two
    /// concurrent toggles from the same voter serialize into two flips rather
    /// than both observing the same prior state.  Self-votes are the caller's
    /// concern.
    pub fn toggle_user_vote(&mut self, voter: UserId, candidate: UserId) -> Result<ToggleOutcome> {
        let tx = self.begin_immediate()?;

        let candidate_found = tx
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![candidate.0],
                |_| Ok(()),
            )
            .optional()?;
        if candidate_found.is_none() {
            return Err(StoreError::NotFound);
        }

        let removed = tx.execute(
            "DELETE FROM user_votes WHERE voter_id = ?1 AND candidate_id = ?2",
            params![voter.0, candidate.0],
        )?;

        let action = if removed > 0 {
            ToggleAction::Unvoted
        } else {
            tx.execute(
                "INSERT INTO user_votes (voter_id, candidate_id, created_at) VALUES (?1, ?2, ?3)",
                params![voter.0, candidate.0, now_timestamp()],
            )?;
            ToggleAction::Voted
        };

        let votes: i64 = tx.query_row(
            "SELECT COUNT(*) FROM user_votes WHERE candidate_id = ?1",
            params![candidate.0],
            |row| row.get(0),
        )?;
        tx.commit()?;

        tracing::info!(voter = %voter, candidate = %candidate, ?action, votes, "user vote toggled");

        Ok(ToggleOutcome {
            action,
            votes,
            has_voted: action == ToggleAction::Voted,
        })
    }

    /// Vote totals per candidate plus, for a known viewer, the candidates
    /// they have voted for.
    pub fn vote_tallies(&self, viewer: Option<UserId>) -> Result<VoteTallies> {
        let mut tallies = VoteTallies::default();

        let mut stmt = self.conn().prepare(
            "SELECT candidate_id, COUNT(*) FROM user_votes GROUP BY candidate_id",
        )?;
        let rows = stmt.query_map([], |row| Ok((UserId(row.get(0)?), row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (candidate, votes) = row?;
            tallies.votes_by_candidate.insert(candidate, votes);
        }

        if let Some(viewer) = viewer {
            let mut stmt = self
                .conn()
                .prepare("SELECT candidate_id FROM user_votes WHERE voter_id = ?1")?;
            let rows = stmt.query_map(params![viewer.0], |row| row.get(0).map(UserId))?;
            for row in rows {
                tallies.my_votes.insert(row?, true);
            }
        }

        Ok(tallies)
    }
}
