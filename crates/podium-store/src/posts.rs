use rusqlite::{params, OptionalExtension};

use podium_shared::rating::round1;
use podium_shared::{MediaId, PostId, PostStatus, UserId};

use crate::database::{now_timestamp, parse_text, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{Media, NewPost, Post, PostChanges, PostFilter, PostSummary};

const POST_COLUMNS: &str =
    "p.id, p.user_id, p.title, p.description, p.type, p.status, p.views, p.created_at";

impl Database {
    /// Insert a post (always `pending`, zero views) and its media rows in
    /// one transaction.
    pub fn create_post(&mut self, new_post: &NewPost) -> Result<Post> {
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO posts (user_id, title, description, type, status, views, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                new_post.author_id.0,
                new_post.title,
                new_post.description,
                new_post.post_type.as_str(),
                PostStatus::Pending.as_str(),
                now_timestamp(),
            ],
        )?;
        let post_id = PostId(tx.last_insert_rowid());

        {
            let mut insert_media =
                tx.prepare("INSERT INTO media (post_id, file_path) VALUES (?1, ?2)")?;
            for path in &new_post.media {
                insert_media.execute(params![post_id.0, path])?;
            }
        }

        let post = tx.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
            params![post_id.0],
            row_to_post,
        )?;
        tx.commit()?;

        tracing::info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    pub fn get_post(&self, id: PostId) -> Result<Post> {
        self.conn()
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
                params![id.0],
                row_to_post,
            )
            .map_err(StoreError::from)
    }

    /// Author of a post, for ownership checks.
    pub fn post_author(&self, id: PostId) -> Result<UserId> {
        self.conn()
            .query_row(
                "SELECT user_id FROM posts WHERE id = ?1",
                params![id.0],
                |row| row.get(0).map(UserId),
            )
            .map_err(StoreError::from)
    }

    /// Newest-first listing annotated with the rating rollup and, when a
    /// viewer is given, that viewer's own rating.
    pub fn list_posts(
        &self,
        filter: &PostFilter,
        viewer: Option<UserId>,
    ) -> Result<Vec<PostSummary>> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, u.name, u.role,
                    COALESCE((SELECT AVG(v.rating) FROM votes v WHERE v.post_id = p.id), 0),
                    (SELECT COUNT(*) FROM votes v WHERE v.post_id = p.id),
                    (SELECT v.rating FROM votes v WHERE v.post_id = p.id AND v.user_id = ?3)
             FROM posts p
             JOIN users u ON u.id = p.user_id
             WHERE (?1 IS NULL OR p.type = ?1)
               AND (?2 IS NULL OR p.status = ?2)
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?4"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.post_type.map(|t| t.as_str()),
                filter.status.map(|s| s.as_str()),
                viewer.map(|u| u.0),
                filter.limit,
            ],
            |row| {
                let post = row_to_post(row)?;
                let author_name: String = row.get(8)?;
                let author_role: String = row.get(9)?;
                let avg_rating: f64 = row.get(10)?;
                let vote_count: i64 = row.get(11)?;
                let user_rating: Option<f64> = row.get(12)?;
                let user_rating = user_rating.map(round1).unwrap_or(0.0);

                Ok(PostSummary {
                    post,
                    author_name,
                    author_role: parse_text(9, &author_role)?,
                    avg_rating: round1(avg_rating),
                    vote_count,
                    user_rating,
                    has_voted: user_rating > 0.0,
                    thumbnail: String::new(),
                    media: Vec::new(),
                })
            },
        )?;

        let mut posts = Vec::new();
        for row in rows {
            let mut summary = row?;
            summary.media = self.media_for_post(summary.post.id)?;
            summary.thumbnail = summary
                .media
                .first()
                .map(|m| m.file_path.clone())
                .unwrap_or_default();
            posts.push(summary);
        }
        Ok(posts)
    }

    /// Media rows of a post in insertion order.
    pub fn media_for_post(&self, post_id: PostId) -> Result<Vec<Media>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT id, post_id, file_path FROM media WHERE post_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![post_id.0], |row| {
            Ok(Media {
                id: MediaId(row.get(0)?),
                post_id: PostId(row.get(1)?),
                file_path: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Apply a partial title/description update and return the new row.
    pub fn update_post(&mut self, id: PostId, changes: &PostChanges) -> Result<Post> {
        let tx = self.conn_mut().transaction()?;
        let affected = tx.execute(
            "UPDATE posts
             SET title = COALESCE(?2, title),
                 description = COALESCE(?3, description)
             WHERE id = ?1",
            params![id.0, changes.title, changes.description],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        let post = tx.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
            params![id.0],
            row_to_post,
        )?;
        tx.commit()?;
        Ok(post)
    }

    pub fn set_post_status(&mut self, id: PostId, status: PostStatus) -> Result<Post> {
        let tx = self.conn_mut().transaction()?;
        let affected = tx.execute(
            "UPDATE posts SET status = ?2 WHERE id = ?1",
            params![id.0, status.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        let post = tx.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
            params![id.0],
            row_to_post,
        )?;
        tx.commit()?;
        Ok(post)
    }

    /// Atomically bump the view counter and return the new value.
    pub fn increment_views(&self, id: PostId) -> Result<i64> {
        self.conn()
            .query_row(
                "UPDATE posts SET views = views + 1 WHERE id = ?1 RETURNING views",
                params![id.0],
                |row| row.get(0),
            )
            .map_err(StoreError::from)
    }

    // ON DELETE CASCADE: media + votes go with it
    pub fn delete_post(&self, id: PostId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id.0])?;
        Ok(affected > 0)
    }
}

/// Whether a post row exists; used inside write transactions.
pub(crate) fn post_exists(conn: &rusqlite::Connection, id: PostId) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM posts WHERE id = ?1", params![id.0], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let post_type: String = row.get(4)?;
    let status: String = row.get(5)?;
    let created_str: String = row.get(7)?;

    Ok(Post {
        id: PostId(row.get(0)?),
        author_id: UserId(row.get(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        post_type: parse_text(4, &post_type)?,
        status: parse_text(5, &status)?,
        views: row.get(6)?,
        created_at: parse_timestamp(7, &created_str)?,
    })
}
