//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `posts`, `media`, `votes`, and
//! `user_votes`.  This is the layout of the first deployments, before votes
//! carried a star rating.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,                 -- argon2 PHC string
    role          TEXT NOT NULL DEFAULT 'viewer'
                  CHECK (role IN ('admin', 'creator', 'viewer')),
    created_at    TEXT NOT NULL                  -- RFC-3339, UTC, microseconds
);

-- ----------------------------------------------------------------
-- Posts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL,                -- FK -> users(id), the author
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    type        TEXT NOT NULL CHECK (type IN ('video', 'audio', 'blog')),
    status      TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
    views       INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id);

-- ----------------------------------------------------------------
-- Media (file paths only; bytes live in external storage)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS media (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id   INTEGER NOT NULL,                  -- FK -> posts(id)
    file_path TEXT NOT NULL,

    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_post ON media(post_id, id);

-- ----------------------------------------------------------------
-- Votes on posts, one per (user, post)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS votes (
    user_id    INTEGER NOT NULL,
    post_id    INTEGER NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (user_id, post_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_votes_post ON votes(post_id);

-- ----------------------------------------------------------------
-- User-to-user votes (directional toggle)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_votes (
    voter_id     INTEGER NOT NULL,
    candidate_id INTEGER NOT NULL,
    created_at   TEXT NOT NULL,

    PRIMARY KEY (voter_id, candidate_id),
    FOREIGN KEY (voter_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (candidate_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_user_votes_candidate ON user_votes(candidate_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
