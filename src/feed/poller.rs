use tracing::{debug, warn};
use url::Url;

use crate::domain::{Post, PostType};
use crate::feed::script::POST_PATH_KINDS;
use crate::feed::{FeedSnapshot, VisibleItem};

/// Turns feed snapshots into candidate posts.
pub struct FeedPoller<'a> {
    snapshot: &'a (dyn FeedSnapshot + Send + Sync),
    min_thumbnail_width: u32,
}

impl<'a> FeedPoller<'a> {
    pub fn new(snapshot: &'a (dyn FeedSnapshot + Send + Sync), min_thumbnail_width: u32) -> Self {
        Self {
            snapshot,
            min_thumbnail_width,
        }
    }

    /// Sample the feed once.
    ///
    /// A failed sample is logged and yields no candidates; the caller polls
    /// again next cycle.
    pub async fn poll(&self) -> Vec<Post> {
        let items = match self.snapshot.current_visible_items().await {
            Ok(items) => items,
            Err(e) => {
                warn!("Feed sample failed: {}", e);
                return Vec::new();
            }
        };

        let posts: Vec<Post> = items
            .iter()
            .filter_map(|item| candidate_from(item, self.min_thumbnail_width))
            .collect();

        debug!(visible = items.len(), candidates = posts.len(), "Sampled feed");
        posts
    }

    /// Number of rendered post thumbnails; errors count as zero.
    pub async fn visible_count(&self) -> usize {
        match self.snapshot.visible_post_count().await {
            Ok(count) => count,
            Err(e) => {
                debug!("Counting posts failed: {}", e);
                0
            }
        }
    }
}

/// Derive a candidate post from one visible thumbnail.
///
/// `None` for thumbnails narrower than `min_width`, and for items without a
/// link, an image, or a shortcode.
pub fn candidate_from(item: &VisibleItem, min_width: u32) -> Option<Post> {
    if item.img_width < min_width {
        return None;
    }

    let href = item.href.as_deref()?;
    let image = item.img_src.as_deref().filter(|s| !s.is_empty())?;
    let link = Url::parse(href).ok()?;
    let (kind, shortcode) = shortcode_of(&link)?;

    let post = Post::new(shortcode, PostType::from_path_kind(kind), href, image)
        .with_caption(item.img_alt.as_deref());
    Some(post)
}

/// First `(kind, shortcode)` pair in the path, e.g. `("reel", "C1x")` for
/// `/someone/reel/C1x/`.
fn shortcode_of(link: &Url) -> Option<(&str, &str)> {
    let segments: Vec<&str> = link.path_segments()?.collect();
    segments.windows(2).find_map(|pair| match pair {
        [kind, code] if POST_PATH_KINDS.contains(kind) && !code.is_empty() => Some((*kind, *code)),
        _ => None,
    })
}
