use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{PostlinkError, Result};
use crate::domain::{Article, Post};
use crate::store::Store;

const POST_COLUMNS: &str = "id, title, url, image, type, timestamp, blog_url, captured_at";

/// Only an id conflict is ignored; any other constraint failure is an error.
const INSERT_POST: &str = "INSERT INTO posts (id, title, url, image, type, timestamp, blog_url, captured_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT(id) DO NOTHING";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| PostlinkError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            PostlinkError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            image: row.get(3)?,
            post_type: row.get(4)?,
            timestamp: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| Self::parse_datetime(&s)),
            blog_url: row.get(6)?,
            captured_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn query_posts(&self, sql: &str) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let posts = stmt
            .query_map([], Self::row_to_post)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}

impl Store for SqliteStore {
    fn load_all_posts(&self) -> Result<Vec<Post>> {
        self.query_posts(&format!(
            "SELECT {} FROM posts ORDER BY captured_at, id",
            POST_COLUMNS
        ))
    }

    fn load_unmapped_posts(&self) -> Result<Vec<Post>> {
        self.query_posts(&format!(
            "SELECT {} FROM posts WHERE blog_url IS NULL ORDER BY captured_at, id",
            POST_COLUMNS
        ))
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let conn = self.conn()?;
        let post = conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
                params![id],
                Self::row_to_post,
            )
            .optional()?;
        Ok(post)
    }

    fn insert_post_if_absent(&self, post: &Post) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            INSERT_POST,
            params![
                post.id,
                post.title,
                post.url,
                post.image,
                post.post_type,
                post.timestamp.map(|dt| dt.to_rfc3339()),
                post.blog_url,
                post.captured_at.to_rfc3339()
            ],
        )?;
        Ok(inserted > 0)
    }

    fn set_blog_url(&self, id: &str, blog_url: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE posts SET blog_url = ?1 WHERE id = ?2",
            params![blog_url, id],
        )?;
        Ok(())
    }

    fn load_articles(&self) -> Result<Vec<Article>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT title, url FROM articles ORDER BY id")?;
        let articles = stmt
            .query_map([], |row| {
                Ok(Article {
                    title: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    fn add_article(&self, article: &Article) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO articles (title, url) VALUES (?1, ?2)",
            params![article.title, article.url],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
