use rusqlite::{params, OptionalExtension};

use podium_shared::constants::RECENT_ACTIVITY_LIMIT;
use podium_shared::rating::round1;
use podium_shared::{PostId, UserId};

use crate::database::{now_timestamp, parse_text, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{ActivityItem, NewUser, Profile, ProfileChanges, ProfileStats, User};

const USER_COLUMNS: &str = "id, name, email, role, student_id, avatar, created_at";

impl Database {
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        self.conn().execute(
            "INSERT INTO users (name, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new_user.name,
                new_user.email,
                new_user.password_hash,
                new_user.role.as_str(),
                now_timestamp(),
            ],
        )?;
        self.get_user(UserId(self.conn().last_insert_rowid()))
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.0],
                row_to_user,
            )
            .map_err(StoreError::from)
    }

    /// Apply a partial profile update and return the refreshed user.
    ///
    /// An email already held by another account is a [`StoreError::Conflict`];
    /// the UNIQUE index backs the check if two updates race.
    pub fn update_profile(&mut self, id: UserId, changes: &ProfileChanges) -> Result<User> {
        let tx = self.begin_immediate()?;

        if let Some(email) = &changes.email {
            let taken = tx
                .query_row(
                    "SELECT 1 FROM users WHERE email = ?1 AND id != ?2",
                    params![email, id.0],
                    |_| Ok(()),
                )
                .optional()?;
            if taken.is_some() {
                return Err(StoreError::Conflict("Email already exists".to_string()));
            }
        }

        let affected = tx.execute(
            "UPDATE users
             SET name          = COALESCE(?2, name),
                 email         = COALESCE(?3, email),
                 student_id    = CASE WHEN ?4 THEN ?5 ELSE student_id END,
                 avatar        = CASE WHEN ?6 THEN ?7 ELSE avatar END,
                 password_hash = COALESCE(?8, password_hash)
             WHERE id = ?1",
            params![
                id.0,
                changes.name,
                changes.email,
                changes.student_id.is_some(),
                changes.student_id.clone().flatten(),
                changes.avatar.is_some(),
                changes.avatar.clone().flatten(),
                changes.password_hash,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        let user = tx.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.0],
            row_to_user,
        )?;
        tx.commit()?;

        tracing::info!(user_id = %id, "profile updated");
        Ok(user)
    }

    /// The user's account, submission and reception totals, and most recent
    /// posts.
    pub fn profile(&self, id: UserId) -> Result<Profile> {
        let user = self.get_user(id)?;

        let (video, audio, blog, total_posts, total_views, total_votes, rating_sum) =
            self.conn().query_row(
                "SELECT
                    COALESCE(SUM(CASE WHEN p.type = 'video' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN p.type = 'audio' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN p.type = 'blog'  THEN 1 ELSE 0 END), 0),
                    COUNT(p.id),
                    COALESCE(SUM(p.views), 0),
                    COALESCE(SUM(v.rating_count), 0),
                    COALESCE(SUM(v.rating_sum), 0)
                 FROM users u
                 LEFT JOIN posts p ON p.user_id = u.id
                 LEFT JOIN (
                     SELECT post_id, COUNT(*) AS rating_count, COALESCE(SUM(rating), 0) AS rating_sum
                     FROM votes
                     GROUP BY post_id
                 ) v ON v.post_id = p.id
                 WHERE u.id = ?1
                 GROUP BY u.id",
                params![id.0],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, f64>(6)?,
                    ))
                },
            )?;

        let avg_rating = if total_votes > 0 {
            round1(rating_sum / total_votes as f64)
        } else {
            0.0
        };
        let rating_points = self.score_scheme().rating_points(rating_sum, total_votes);

        Ok(Profile {
            user,
            stats: ProfileStats {
                total_score: total_views + rating_points,
                avg_rating,
                video_submissions: video,
                audio_submissions: audio,
                blog_submissions: blog,
                total_posts,
                total_votes,
                total_views,
            },
            recent_activity: self.recent_activity(id, RECENT_ACTIVITY_LIMIT)?,
        })
    }

    /// The user's newest posts with their vote counts.
    pub fn recent_activity(&self, id: UserId, limit: u32) -> Result<Vec<ActivityItem>> {
        let mut stmt = self.conn().prepare(
            "SELECT p.id, p.title, p.type, p.status, p.created_at, p.views,
                    COALESCE(v.rating_count, 0)
             FROM posts p
             LEFT JOIN (
                 SELECT post_id, COUNT(*) AS rating_count
                 FROM votes
                 GROUP BY post_id
             ) v ON v.post_id = p.id
             WHERE p.user_id = ?1
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![id.0, limit], |row| {
            let post_type: String = row.get(2)?;
            let status: String = row.get(3)?;
            let created_str: String = row.get(4)?;
            Ok(ActivityItem {
                id: PostId(row.get(0)?),
                title: row.get(1)?,
                post_type: parse_text(2, &post_type)?,
                status: parse_text(3, &status)?,
                created_at: parse_timestamp(4, &created_str)?,
                views: row.get(5)?,
                votes: row.get(6)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    let created_str: String = row.get(6)?;

    Ok(User {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        role: parse_text(3, &role)?,
        student_id: row.get(4)?,
        avatar: row.get(5)?,
        created_at: parse_timestamp(6, &created_str)?,
    })
}
