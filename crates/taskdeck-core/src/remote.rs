use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info};

pub const DEFAULT_POSTS_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_PAGE_SIZE: usize = 10;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub body: String,
}

/// One-shot blocking GET of the whole post collection. No retry; the caller
/// surfaces the error message inline.
#[tracing::instrument]
pub fn fetch_posts(url: &str) -> anyhow::Result<Vec<Post>> {
    info!(url, "fetching posts");

    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("request to {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("server returned {status}"));
    }

    let posts: Vec<Post> = response.json().context("failed to decode post payload")?;
    debug!(count = posts.len(), "fetched posts");
    Ok(posts)
}

/// Case-insensitive substring match on title or body. A blank query returns
/// the full set, order untouched.
pub fn search<'a>(posts: &'a [Post], query: &str) -> Vec<&'a Post> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return posts.iter().collect();
    }

    posts
        .iter()
        .filter(|p| {
            p.title.to_lowercase().contains(&needle) || p.body.to_lowercase().contains(&needle)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

/// Clamped page window over a set of `len` items. There is always at least
/// one page, even when the set is empty.
pub fn paginate(len: usize, page: usize, page_size: usize) -> PageWindow {
    let size = page_size.max(1);
    let total_pages = len.div_ceil(size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * size;
    let end = (start + size).min(len);

    PageWindow {
        page,
        total_pages,
        start,
        end,
    }
}

/// Client-side view over the fetched set: search plus pagination, with the
/// fetch outcome (loading flag, inline error) folded in.
#[derive(Debug)]
pub struct PostBrowser {
    items: Vec<Post>,
    query: String,
    page: usize,
    page_size: usize,
    loading: bool,
    error: Option<String>,
}

impl PostBrowser {
    pub fn new(page_size: usize) -> Self {
        Self {
            items: vec![],
            query: String::new(),
            page: 1,
            page_size: page_size.max(1),
            loading: false,
            error: None,
        }
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Applies the outcome of the one-shot fetch; a browser dropped before
    /// its response arrives simply never sees it.
    pub fn apply_fetch(&mut self, result: Result<Vec<Post>, String>) {
        match result {
            Ok(items) => {
                debug!(count = items.len(), "fetch applied");
                self.items = items;
            }
            Err(message) => {
                debug!(error = %message, "fetch failed");
                self.error = Some(message);
            }
        }
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Changing the query always jumps back to the first page.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1).max(1));
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        paginate(search(&self.items, &self.query).len(), 1, self.page_size).total_pages
    }

    pub fn visible(&self) -> Vec<&Post> {
        let matched = search(&self.items, &self.query);
        let window = paginate(matched.len(), self.page, self.page_size);
        matched[window.start..window.end].to_vec()
    }
}
