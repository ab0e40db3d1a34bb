//! Posting one message to both backends.
//!
//! Sends are sequential, Fanfou first. There is no rollback: if the second
//! send fails the first post stays up and the error says so.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::adapter::Sources;
use crate::app::flight::InFlight;
use crate::app::{ConfluenceError, Result};
use crate::domain::{Post, PostDraft, Source};

/// Longest message either backend accepts.
pub const MAX_STATUS_CHARS: usize = 140;

/// Characters left before the limit. Negative when over.
pub fn remaining_chars(text: &str) -> i64 {
    MAX_STATUS_CHARS as i64 - text.chars().count() as i64
}

/// The two posts created by one message.
#[derive(Debug, Clone)]
pub struct DualPost {
    pub fanfou: Post,
    pub mastodon: Post,
}

pub struct Composer {
    sources: Sources,
    sending: AtomicBool,
}

impl Composer {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            sending: AtomicBool::new(false),
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Sources that would block a send.
    pub fn missing_accounts(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|&source| !self.sources.get(source).is_authenticated())
            .collect()
    }

    pub async fn send_message(&self, draft: &PostDraft) -> Result<DualPost> {
        validate(draft)?;

        let Some(_guard) = InFlight::acquire(&self.sending) else {
            return Err(ConfluenceError::ComposeInFlight);
        };

        let missing = self.missing_accounts();
        if !missing.is_empty() {
            return Err(ConfluenceError::DualAuthRequired { missing });
        }

        let fanfou = self.post_to(Source::Fanfou, draft).await?;

        let mastodon = match self.post_to(Source::Mastodon, draft).await {
            Ok(post) => post,
            Err(e) => {
                warn!("Posted {} but Mastodon failed: {}", fanfou.id, e);
                return Err(ConfluenceError::PartialPost {
                    posted: Source::Fanfou,
                    failed: Source::Mastodon,
                    reason: e.to_string(),
                });
            }
        };

        info!("Posted {} and {}", fanfou.id, mastodon.id);
        Ok(DualPost { fanfou, mastodon })
    }

    async fn post_to(&self, source: Source, draft: &PostDraft) -> Result<Post> {
        let raw = self.sources.get(source).create_post(draft).await?;
        Post::from_raw(raw)
    }
}

fn validate(draft: &PostDraft) -> Result<()> {
    if draft.content.trim().is_empty() {
        return Err(ConfluenceError::InvalidDraft("message is empty".into()));
    }
    let remaining = remaining_chars(&draft.content);
    if remaining < 0 {
        return Err(ConfluenceError::InvalidDraft(format!(
            "message is {} characters over the limit",
            -remaining
        )));
    }
    Ok(())
}
