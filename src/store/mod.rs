use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::models::*;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Connection lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe SQLite store.
///
/// Opened once at process start and shared through `AppState`. Every public
/// method takes the connection lock for a single statement group, so a
/// sequence of calls is not atomic. Edge inserts rely on the primary-key
/// constraint instead of a prior existence check.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                auth_sub TEXT UNIQUE NOT NULL,
                name TEXT,
                email TEXT,
                picture TEXT,
                is_custom_time INTEGER NOT NULL DEFAULT 0,
                custom_time_alarm TEXT,
                today_time TEXT,
                time_length INTEGER NOT NULL DEFAULT 10,
                pixel_amount INTEGER NOT NULL DEFAULT 10
            );

            CREATE TABLE IF NOT EXISTS arts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                image TEXT,
                title TEXT,
                comments TEXT NOT NULL DEFAULT '[]',
                modified_date TEXT,
                previous_art_id INTEGER,
                is_public INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS galleries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT,
                profile TEXT,
                comments TEXT NOT NULL DEFAULT '[]',
                creation_date TEXT,
                is_public INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS friends (
                user_id INTEGER NOT NULL,
                friend_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, friend_id),
                CHECK (user_id <> friend_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (friend_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS gallery_arts (
                gallery_id INTEGER NOT NULL,
                art_id INTEGER NOT NULL,
                PRIMARY KEY (gallery_id, art_id),
                FOREIGN KEY (gallery_id) REFERENCES galleries(id) ON DELETE CASCADE,
                FOREIGN KEY (art_id) REFERENCES arts(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_arts_user_id ON arts(user_id);
            CREATE INDEX IF NOT EXISTS idx_galleries_user_id ON galleries(user_id);
            CREATE INDEX IF NOT EXISTS idx_gallery_arts_art_id ON gallery_arts(art_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Insert a user for `auth_sub` unless one already exists.
    /// Returns the stored row and whether it was created by this call.
    pub fn create_user_if_absent(
        &self,
        auth_sub: &str,
        profile: &NewUser,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, bool)> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"INSERT INTO users (auth_sub, name, email, picture, is_custom_time,
                custom_time_alarm, today_time, time_length, pixel_amount)
               VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, ?6, ?7)
               ON CONFLICT(auth_sub) DO NOTHING"#,
            params![
                auth_sub,
                &profile.name,
                &profile.email,
                &profile.picture,
                now.to_rfc3339(),
                DEFAULT_TIME_LENGTH,
                DEFAULT_PIXEL_AMOUNT,
            ],
        )?;

        let user = conn.query_row(
            "SELECT * FROM users WHERE auth_sub = ?1",
            params![auth_sub],
            row_to_user,
        )?;
        Ok((user, inserted == 1))
    }

    pub fn get_user(&self, id: i64) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], row_to_user)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!("User {}", id)),
                _ => StoreError::Database(e),
            })
    }

    pub fn get_user_by_auth_sub(&self, auth_sub: &str) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM users WHERE auth_sub = ?1",
            params![auth_sub],
            row_to_user,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StoreError::NotFound(format!("User with subject {}", auth_sub))
            }
            _ => StoreError::Database(e),
        })
    }

    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY id ASC")?;
        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Delete a user. Friend edges, arts and galleries go with it.
    pub fn delete_user(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("User {}", id)));
        }
        Ok(())
    }

    /// Set `today_time` on every user, returning how many rows changed
    pub fn stamp_today_time(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute("UPDATE users SET today_time = ?1", params![now.to_rfc3339()])?;
        Ok(rows)
    }

    pub fn count_users(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn latest_user(&self) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row("SELECT * FROM users ORDER BY id DESC LIMIT 1", [], row_to_user)
            .optional()?;
        Ok(user)
    }

    // ==================== Friendship Operations ====================

    /// Insert the directed edge `user_id → friend_id`.
    /// Returns false when the edge already existed.
    pub fn add_friend(&self, user_id: i64, friend_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"INSERT INTO friends (user_id, friend_id) VALUES (?1, ?2)
               ON CONFLICT(user_id, friend_id) DO NOTHING"#,
            params![user_id, friend_id],
        )?;
        Ok(rows == 1)
    }

    /// Remove the directed edge. Returns false when there was nothing to remove.
    pub fn remove_friend(&self, user_id: i64, friend_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM friends WHERE user_id = ?1 AND friend_id = ?2",
            params![user_id, friend_id],
        )?;
        Ok(rows == 1)
    }

    pub fn is_friend(&self, user_id: i64, friend_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM friends WHERE user_id = ?1 AND friend_id = ?2",
                params![user_id, friend_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Users that `user_id` has befriended, ordered by id
    pub fn list_friends(&self, user_id: i64) -> StoreResult<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT u.* FROM friends f
               JOIN users u ON u.id = f.friend_id
               WHERE f.user_id = ?1
               ORDER BY u.id ASC"#,
        )?;
        let rows = stmt.query_map(params![user_id], row_to_user)?;

        let mut friends = Vec::new();
        for row in rows {
            friends.push(row?);
        }
        Ok(friends)
    }

    // ==================== Art Operations ====================

    /// Create an empty art owned by `user_id`
    pub fn create_art(&self, user_id: i64, now: DateTime<Utc>) -> StoreResult<Art> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO arts (user_id, image, title, comments, modified_date, previous_art_id, is_public)
               VALUES (?1, NULL, NULL, '[]', ?2, NULL, 0)"#,
            params![user_id, now.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();

        let art = conn.query_row("SELECT * FROM arts WHERE id = ?1", params![id], row_to_art)?;
        Ok(art)
    }

    pub fn get_art(&self, id: i64) -> StoreResult<Art> {
        let conn = self.conn()?;
        conn.query_row("SELECT * FROM arts WHERE id = ?1", params![id], row_to_art)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!("Art {}", id)),
                _ => StoreError::Database(e),
            })
    }

    pub fn art_exists(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row("SELECT 1 FROM arts WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_arts(&self, limit: i64, offset: i64) -> StoreResult<Vec<Art>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM arts ORDER BY id ASC LIMIT ?1 OFFSET ?2")?;
        let rows = stmt.query_map(params![limit, offset], row_to_art)?;

        let mut arts = Vec::new();
        for row in rows {
            arts.push(row?);
        }
        Ok(arts)
    }

    pub fn count_arts(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM arts", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Write every mutable column of `art`. The owner column is never touched.
    pub fn update_art(&self, art: &Art) -> StoreResult<()> {
        let conn = self.conn()?;
        let comments_json = serde_json::to_string(&art.comments)?;

        let rows = conn.execute(
            r#"UPDATE arts SET image = ?1, title = ?2, comments = ?3, modified_date = ?4,
               previous_art_id = ?5, is_public = ?6 WHERE id = ?7"#,
            params![
                &art.image,
                &art.title,
                &comments_json,
                art.modified_date.map(|d| d.to_rfc3339()),
                art.previous_art_id,
                art.is_public,
                art.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("Art {}", art.id)));
        }
        Ok(())
    }

    /// Delete an art. Arts pointing at it keep their now-dangling link.
    pub fn delete_art(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM arts WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Art {}", id)));
        }
        Ok(())
    }

    pub fn latest_art(&self) -> StoreResult<Option<Art>> {
        let conn = self.conn()?;
        let art = conn
            .query_row("SELECT * FROM arts ORDER BY id DESC LIMIT 1", [], row_to_art)
            .optional()?;
        Ok(art)
    }

    // ==================== Gallery Operations ====================

    /// Create an empty gallery owned by `user_id`
    pub fn create_gallery(&self, user_id: i64, now: DateTime<Utc>) -> StoreResult<Gallery> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO galleries (user_id, name, profile, comments, creation_date, is_public)
               VALUES (?1, NULL, NULL, '[]', ?2, 0)"#,
            params![user_id, now.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();

        let gallery = conn.query_row(
            "SELECT * FROM galleries WHERE id = ?1",
            params![id],
            row_to_gallery,
        )?;
        Ok(gallery)
    }

    pub fn get_gallery(&self, id: i64) -> StoreResult<Gallery> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM galleries WHERE id = ?1",
            params![id],
            row_to_gallery,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!("Gallery {}", id)),
            _ => StoreError::Database(e),
        })
    }

    pub fn list_galleries(&self, limit: i64, offset: i64) -> StoreResult<Vec<Gallery>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM galleries ORDER BY id ASC LIMIT ?1 OFFSET ?2")?;
        let rows = stmt.query_map(params![limit, offset], row_to_gallery)?;

        let mut galleries = Vec::new();
        for row in rows {
            galleries.push(row?);
        }
        Ok(galleries)
    }

    pub fn count_galleries(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM galleries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Write the mutable columns of `gallery`. Owner and creation date are fixed.
    pub fn update_gallery(&self, gallery: &Gallery) -> StoreResult<()> {
        let conn = self.conn()?;
        let comments_json = serde_json::to_string(&gallery.comments)?;

        let rows = conn.execute(
            r#"UPDATE galleries SET name = ?1, profile = ?2, comments = ?3, is_public = ?4
               WHERE id = ?5"#,
            params![
                &gallery.name,
                &gallery.profile,
                &comments_json,
                gallery.is_public,
                gallery.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("Gallery {}", gallery.id)));
        }
        Ok(())
    }

    pub fn delete_gallery(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM galleries WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Gallery {}", id)));
        }
        Ok(())
    }

    pub fn latest_gallery(&self) -> StoreResult<Option<Gallery>> {
        let conn = self.conn()?;
        let gallery = conn
            .query_row(
                "SELECT * FROM galleries ORDER BY id DESC LIMIT 1",
                [],
                row_to_gallery,
            )
            .optional()?;
        Ok(gallery)
    }

    // ==================== Gallery Membership Operations ====================

    /// Insert the membership edge. Returns false when it already existed.
    pub fn add_gallery_art(&self, gallery_id: i64, art_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"INSERT INTO gallery_arts (gallery_id, art_id) VALUES (?1, ?2)
               ON CONFLICT(gallery_id, art_id) DO NOTHING"#,
            params![gallery_id, art_id],
        )?;
        Ok(rows == 1)
    }

    /// Remove the membership edge. Returns false when there was nothing to remove.
    pub fn remove_gallery_art(&self, gallery_id: i64, art_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM gallery_arts WHERE gallery_id = ?1 AND art_id = ?2",
            params![gallery_id, art_id],
        )?;
        Ok(rows == 1)
    }

    /// Arts in a gallery, ordered by art id
    pub fn list_gallery_arts(&self, gallery_id: i64) -> StoreResult<Vec<Art>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT a.* FROM gallery_arts ga
               JOIN arts a ON a.id = ga.art_id
               WHERE ga.gallery_id = ?1
               ORDER BY a.id ASC"#,
        )?;
        let rows = stmt.query_map(params![gallery_id], row_to_art)?;

        let mut arts = Vec::new();
        for row in rows {
            arts.push(row?);
        }
        Ok(arts)
    }

    // ==================== Maintenance ====================

    /// Row counts for every user table, ordered by table name
    pub fn table_counts(&self) -> StoreResult<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT name FROM sqlite_master
               WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
               ORDER BY name"#,
        )?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tables = Vec::new();
        for name in names {
            tables.push(name?);
        }

        let mut counts = Vec::with_capacity(tables.len());
        for table in tables {
            let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            counts.push((table, count));
        }
        Ok(counts)
    }

    /// Delete every row, edges first
    pub fn reset(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            DELETE FROM gallery_arts;
            DELETE FROM friends;
            DELETE FROM arts;
            DELETE FROM galleries;
            DELETE FROM users;
            "#,
        )?;
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        auth_sub: row.get("auth_sub")?,
        name: row.get("name")?,
        email: row.get("email")?,
        picture: row.get("picture")?,
        is_custom_time: row.get("is_custom_time")?,
        custom_time_alarm: row.get("custom_time_alarm")?,
        today_time: parse_datetime(row.get("today_time")?),
        time_length: row.get("time_length")?,
        pixel_amount: row.get("pixel_amount")?,
    })
}

fn row_to_art(row: &rusqlite::Row) -> rusqlite::Result<Art> {
    let comments: Option<String> = row.get("comments")?;

    Ok(Art {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        image: row.get("image")?,
        title: row.get("title")?,
        comments: parse_comments(comments.as_deref()),
        modified_date: parse_datetime(row.get("modified_date")?),
        is_public: row.get("is_public")?,
        previous_art_id: row.get("previous_art_id")?,
    })
}

fn row_to_gallery(row: &rusqlite::Row) -> rusqlite::Result<Gallery> {
    let comments: Option<String> = row.get("comments")?;

    Ok(Gallery {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        profile: row.get("profile")?,
        comments: parse_comments(comments.as_deref()),
        creation_date: parse_datetime(row.get("creation_date")?),
        is_public: row.get("is_public")?,
    })
}

fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
