use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use serde::{Deserialize, Serialize};

use crate::app::{ConfluenceError, Result};
use crate::domain::raw::RawPost;
use crate::domain::Source;

/// Fanfou's `created_at` layout: `Wed Apr 09 06:25:52 +0000 2025`.
pub const FANFOU_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// A post normalized to one shape regardless of its backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// `source.prefix() + native_id`, unique across sources.
    pub id: String,
    pub source: Source,
    pub created_at: DateTime<Utc>,
    pub native_id: String,
    pub raw: RawPost,
}

/// A media attachment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub url: Option<String>,
    pub preview_url: Option<String>,
}

impl Post {
    pub fn from_raw(raw: RawPost) -> Result<Self> {
        let source = raw.source();
        let native_id = raw.native_id().to_string();
        let created_at = resolve_timestamp(raw.created_at())?;

        Ok(Self {
            id: source.global_id(&native_id),
            source,
            created_at,
            native_id,
            raw,
        })
    }

    pub fn author(&self) -> &str {
        let name = match &self.raw {
            RawPost::Fanfou(status) => status.user.as_ref().map(|u| u.name.as_str()),
            RawPost::Mastodon(status) => status.account.as_ref().map(|a| {
                if a.display_name.is_empty() {
                    a.acct.as_str()
                } else {
                    a.display_name.as_str()
                }
            }),
        };
        name.unwrap_or("(unknown)")
    }

    /// Body text with HTML entities decoded. Markup is left in place.
    pub fn text(&self) -> String {
        let body = match &self.raw {
            RawPost::Fanfou(status) => &status.text,
            RawPost::Mastodon(status) => &status.content,
        };
        decode_html_entities(body).to_string()
    }

    /// Attachments to display for this post.
    ///
    /// A boost shows the boosted post's attachments when it has any.
    pub fn media(&self) -> Vec<MediaAttachment> {
        match &self.raw {
            RawPost::Mastodon(status) => {
                let attachments = status
                    .reblog
                    .as_ref()
                    .filter(|reblog| !reblog.media_attachments.is_empty())
                    .map(|reblog| &reblog.media_attachments)
                    .unwrap_or(&status.media_attachments);

                attachments
                    .iter()
                    .map(|m| MediaAttachment {
                        url: m.url.clone(),
                        preview_url: m.preview_url.clone(),
                    })
                    .collect()
            }
            RawPost::Fanfou(status) => status
                .photo
                .iter()
                .map(|photo| MediaAttachment {
                    url: photo.largeurl.clone().or_else(|| photo.imageurl.clone()),
                    preview_url: photo.thumburl.clone(),
                })
                .collect(),
        }
    }
}

/// Resolve a backend date string to a UTC instant.
///
/// Accepts RFC 3339 (Mastodon), Fanfou's ctime-like layout and RFC 2822.
pub fn resolve_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, FANFOU_DATE_FORMAT))
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ConfluenceError::Timestamp(s.to_string()))
}
