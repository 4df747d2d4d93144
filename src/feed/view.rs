use std::collections::{HashMap, HashSet};

pub const EXCERPT_CHARS: usize = 150;

/// First `max_chars` characters of `content`, with an ellipsis when cut.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// 1-based page cursor over a list of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    per_page: usize,
}

impl Pager {
    pub fn new(per_page: usize) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.per_page).max(1)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page - 1) * self.per_page;
        if start >= items.len() {
            return &items[..0];
        }
        let end = (start + self.per_page).min(items.len());
        &items[start..end]
    }

    pub fn next(&mut self, len: usize) -> bool {
        if self.page < self.total_pages(len) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `page`, clamped into range.
    pub fn go_to(&mut self, page: usize, len: usize) {
        self.page = page.clamp(1, self.total_pages(len));
    }

    /// Pull the cursor back after the list shrank.
    pub fn clamp(&mut self, len: usize) {
        self.page = self.page.min(self.total_pages(len));
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Presentation state for a list of posts.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    expanded: HashSet<String>,
    comments_open: HashSet<String>,
    drafts: HashMap<String, String>,
    pub pager: Pager,
}

impl ViewState {
    pub fn new(per_page: usize) -> Self {
        Self {
            pager: Pager::new(per_page),
            ..Self::default()
        }
    }

    pub fn toggle_expanded(&mut self, post_id: &str) -> bool {
        toggle(&mut self.expanded, post_id)
    }

    pub fn is_expanded(&self, post_id: &str) -> bool {
        self.expanded.contains(post_id)
    }

    pub fn toggle_comments(&mut self, post_id: &str) -> bool {
        toggle(&mut self.comments_open, post_id)
    }

    pub fn comments_open(&self, post_id: &str) -> bool {
        self.comments_open.contains(post_id)
    }

    pub fn set_draft(&mut self, post_id: &str, text: impl Into<String>) {
        self.drafts.insert(post_id.to_string(), text.into());
    }

    pub fn draft(&self, post_id: &str) -> &str {
        self.drafts.get(post_id).map(String::as_str).unwrap_or("")
    }

    /// Called once a comment has been committed.
    pub fn clear_draft(&mut self, post_id: &str) {
        self.drafts.remove(post_id);
    }

    /// Body text to show for a post given its expanded flag.
    pub fn body<'a>(&self, post_id: &str, content: &'a str) -> std::borrow::Cow<'a, str> {
        if self.is_expanded(post_id) {
            std::borrow::Cow::Borrowed(content)
        } else {
            std::borrow::Cow::Owned(excerpt(content, EXCERPT_CHARS))
        }
    }

    /// Forget state for posts that are no longer listed.
    pub fn retain<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let live: HashSet<&str> = ids.into_iter().collect();
        self.expanded.retain(|id| live.contains(id.as_str()));
        self.comments_open.retain(|id| live.contains(id.as_str()));
        self.drafts.retain(|id, _| live.contains(id.as_str()));
        self.pager.clamp(live.len());
    }
}

fn toggle(set: &mut HashSet<String>, id: &str) -> bool {
    if set.remove(id) {
        false
    } else {
        set.insert(id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_cuts_on_char_boundary() {
        assert_eq!(excerpt("short", 150), "short");
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn pager_walks_pages() {
        let items: Vec<u32> = (1..=12).collect();
        let mut pager = Pager::new(5);
        assert_eq!(pager.total_pages(items.len()), 3);
        assert_eq!(pager.slice(&items), &[1, 2, 3, 4, 5]);

        assert!(pager.next(items.len()));
        assert!(pager.next(items.len()));
        assert_eq!(pager.slice(&items), &[11, 12]);
        assert!(!pager.next(items.len()));

        assert!(pager.prev());
        assert_eq!(pager.page(), 2);
    }

    #[test]
    fn pager_on_empty_list_has_one_page() {
        let pager = Pager::new(5);
        let empty: [u32; 0] = [];
        assert_eq!(pager.total_pages(0), 1);
        assert!(pager.slice(&empty).is_empty());
    }

    #[test]
    fn toggles_are_per_post() {
        let mut view = ViewState::new(5);
        assert!(view.toggle_expanded("p1"));
        assert!(view.is_expanded("p1"));
        assert!(!view.is_expanded("p2"));
        assert!(!view.toggle_expanded("p1"));

        assert!(view.toggle_comments("p2"));
        assert!(view.comments_open("p2"));
    }

    #[test]
    fn body_is_excerpt_until_expanded() {
        let mut view = ViewState::new(5);
        let long = "x".repeat(200);
        assert_eq!(view.body("p1", &long).len(), EXCERPT_CHARS + 3);
        view.toggle_expanded("p1");
        assert_eq!(view.body("p1", &long).len(), 200);
    }

    #[test]
    fn retain_drops_state_of_removed_posts() {
        let mut view = ViewState::new(1);
        view.set_draft("p1", "draft");
        view.toggle_expanded("p2");
        view.pager.go_to(2, 2);

        view.retain(["p1"]);
        assert_eq!(view.draft("p1"), "draft");
        assert!(!view.is_expanded("p2"));
        assert_eq!(view.pager.page(), 1);
    }
}
