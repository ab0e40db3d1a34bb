use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::post::resolve_timestamp;
use crate::domain::raw::{RawPost, RawThread};
use crate::domain::Source;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub source: Source,
    pub created_at: DateTime<Utc>,
    /// Only meaningful for threaded sources.
    pub is_ancestor: bool,
    pub raw: RawPost,
}

/// Cached snapshot of one post's comments, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentThread {
    pub post_id: String,
    pub comments: Vec<Comment>,
    pub fetched_at: DateTime<Utc>,
}

impl CommentThread {
    pub fn new(post_id: String, comments: Vec<Comment>) -> Self {
        Self {
            post_id,
            comments,
            fetched_at: Utc::now(),
        }
    }
}

impl Comment {
    fn from_raw(raw: RawPost, is_ancestor: bool) -> Option<Self> {
        let created_at = match resolve_timestamp(raw.created_at()) {
            Ok(dt) => dt,
            Err(e) => {
                tracing::warn!("Skipping comment {}: {}", raw.native_id(), e);
                return None;
            }
        };
        let source = raw.source();

        Some(Self {
            id: source.global_id(raw.native_id()),
            source,
            created_at,
            is_ancestor,
            raw,
        })
    }
}

/// Flatten a backend thread into comments sorted oldest first.
///
/// Split threads keep ancestors ahead of descendants on equal timestamps.
/// Flat threads drop the post itself, matched by native id.
pub fn normalize_thread(post_native_id: &str, thread: RawThread) -> Vec<Comment> {
    let mut comments: Vec<Comment> = match thread {
        RawThread::Split {
            ancestors,
            descendants,
        } => ancestors
            .into_iter()
            .map(|raw| (raw, true))
            .chain(descendants.into_iter().map(|raw| (raw, false)))
            .filter_map(|(raw, is_ancestor)| Comment::from_raw(raw, is_ancestor))
            .collect(),
        RawThread::Flat(statuses) => statuses
            .into_iter()
            .filter(|raw| raw.native_id() != post_native_id)
            .filter_map(|raw| Comment::from_raw(raw, false))
            .collect(),
    };

    // Stable sort keeps backend order on ties.
    comments.sort_by_key(|c| c.created_at);
    comments
}
