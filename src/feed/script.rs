/// Path segments that precede a post shortcode in feed links.
pub const POST_PATH_KINDS: [&str; 2] = ["p", "reel"];

/// Generates the JavaScript evaluated inside the feed page.
#[derive(Debug, Clone, Default)]
pub struct FeedScripts;

impl FeedScripts {
    pub fn new() -> Self {
        Self
    }

    /// CSS selector matching post thumbnails, e.g. `a[href*="/p/"] img`.
    fn thumbnail_selector(&self) -> String {
        POST_PATH_KINDS
            .iter()
            .map(|kind| format!("a[href*=\"/{}/\"] img", kind))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Script returning every visible thumbnail as
    /// `{href, imgSrc, imgAlt, imgWidth}`, in document order.
    ///
    /// No filtering happens here; the poller decides what is a post.
    pub fn visible_items_script(&self) -> String {
        let selector = self.thumbnail_selector().replace('\'', "\\'");

        format!(
            r#"
            (() => {{
                const imgs = Array.from(document.querySelectorAll('{selector}'));
                return imgs.map(img => {{
                    const anchor = img.closest('a');
                    return {{
                        href: anchor ? anchor.href : null,
                        imgSrc: img.currentSrc || img.src || null,
                        imgAlt: img.alt || null,
                        imgWidth: img.width || 0
                    }};
                }});
            }})()
            "#
        )
    }

    /// Script returning how many post thumbnails are rendered.
    pub fn post_count_script(&self) -> String {
        let selector = self.thumbnail_selector().replace('\'', "\\'");
        format!("document.querySelectorAll('{selector}').length")
    }
}
