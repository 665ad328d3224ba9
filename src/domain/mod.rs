pub mod article;
pub mod post;

pub use article::Article;
pub use post::{Post, PostType};
