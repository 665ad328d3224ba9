pub mod sqlite;

use crate::app::Result;
use crate::domain::{Article, Post};

pub use sqlite::SqliteStore;

pub trait Store {
    // Post operations
    fn load_all_posts(&self) -> Result<Vec<Post>>;
    fn load_unmapped_posts(&self) -> Result<Vec<Post>>;
    fn get_post(&self, id: &str) -> Result<Option<Post>>;
    /// Returns `false` when a post with the same id already exists.
    fn insert_post_if_absent(&self, post: &Post) -> Result<bool>;
    fn set_blog_url(&self, id: &str, blog_url: &str) -> Result<()>;

    // Article catalog
    fn load_articles(&self) -> Result<Vec<Article>>;
    fn add_article(&self, article: &Article) -> Result<i64>;
}
