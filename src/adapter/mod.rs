pub mod fanfou;
pub mod mastodon;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::app::{ConfluenceError, Result};
use crate::domain::{PostDraft, RawPost, RawThread, Source};
use crate::gateway::{Request, Response};

pub use fanfou::FanfouAdapter;
pub use mastodon::{normalize_instance, MastodonAdapter};

/// One backend, normalized to a common shape.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Whether credentials are configured. Unauthenticated adapters are
    /// skipped by the timeline and refused by the composer.
    fn is_authenticated(&self) -> bool;

    /// Home timeline, newest first. `cursor` asks for posts strictly older
    /// than that native id.
    async fn list_timeline(&self, cursor: Option<&str>, page_size: usize) -> Result<Vec<RawPost>>;

    async fn get_thread(&self, native_id: &str) -> Result<RawThread>;

    async fn create_post(&self, draft: &PostDraft) -> Result<RawPost>;
}

/// The pair of configured backends.
#[derive(Clone)]
pub struct Sources {
    fanfou: Arc<dyn SourceAdapter>,
    mastodon: Arc<dyn SourceAdapter>,
}

impl Sources {
    pub fn new(fanfou: Arc<dyn SourceAdapter>, mastodon: Arc<dyn SourceAdapter>) -> Self {
        Self { fanfou, mastodon }
    }

    pub fn get(&self, source: Source) -> &Arc<dyn SourceAdapter> {
        match source {
            Source::Fanfou => &self.fanfou,
            Source::Mastodon => &self.mastodon,
        }
    }
}

/// Decode a JSON body, treating any non-2xx status as a failure.
pub(crate) fn decode<T: DeserializeOwned>(request: &Request, response: Response) -> Result<T> {
    if !response.is_success() {
        return Err(ConfluenceError::HttpStatus {
            status: response.status,
            url: request.url.to_string(),
        });
    }
    Ok(serde_json::from_slice(&response.body)?)
}
