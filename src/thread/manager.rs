use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::adapter::{SourceAdapter, Sources};
use crate::app::flight::InFlight;
use crate::app::{ConfluenceError, Result};
use crate::domain::{normalize_thread, Comment, CommentThread, Post, PostDraft, ReplyTarget, Source};
use crate::store::ThreadSnapshots;

type SharedFetch = Shared<BoxFuture<'static, Vec<Comment>>>;
type InFlightMap = Arc<Mutex<HashMap<String, SharedFetch>>>;

/// Fetches and caches comment threads, one request per post at a time.
pub struct ThreadCacheManager {
    sources: Sources,
    snapshots: ThreadSnapshots,
    in_flight: InFlightMap,
    sending: AtomicBool,
}

impl ThreadCacheManager {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            snapshots: ThreadSnapshots::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            sending: AtomicBool::new(false),
        }
    }

    /// Fetch the comments of `post_id`, oldest first.
    ///
    /// Concurrent callers for the same post share one request. On failure
    /// the last cached snapshot is returned, or nothing.
    pub async fn fetch_comments(&self, post_id: &str, source: Source) -> Vec<Comment> {
        let fetch = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(post_id) {
                Some(pending) => {
                    debug!("Joining in-flight fetch for {}", post_id);
                    pending.clone()
                }
                None => {
                    let fetch = run_fetch(
                        self.sources.get(source).clone(),
                        self.snapshots.clone(),
                        self.in_flight.clone(),
                        post_id.to_string(),
                        source,
                    )
                    .boxed()
                    .shared();
                    in_flight.insert(post_id.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Reply to `post_id`, then refetch its thread.
    pub async fn send_comment(
        &self,
        post_id: &str,
        content: &str,
        source: Source,
        reply_to_user: Option<&str>,
    ) -> Result<Post> {
        if content.trim().is_empty() {
            return Err(ConfluenceError::InvalidDraft("comment is empty".into()));
        }
        let Some(_guard) = InFlight::acquire(&self.sending) else {
            return Err(ConfluenceError::ComposeInFlight);
        };

        let draft = PostDraft::new(content).replying_to(ReplyTarget {
            native_id: source.native_id(post_id).to_string(),
            user_id: reply_to_user.map(String::from),
        });

        let raw = self.sources.get(source).create_post(&draft).await?;
        let post = Post::from_raw(raw)?;
        info!("Replied to {} as {}", post_id, post.id);

        // A fetch already in flight was sent before the reply existed.
        let pending = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(post_id)
            .cloned();
        if let Some(pending) = pending {
            debug!("Waiting out an earlier fetch of {}", post_id);
            pending.await;
        }

        self.fetch_comments(post_id, source).await;
        Ok(post)
    }

    /// Last fetched comments of a post, without touching the network.
    pub fn cached_comments(&self, post_id: &str) -> Option<Vec<Comment>> {
        self.snapshots.get(post_id).map(|thread| thread.comments)
    }

    pub fn snapshot(&self, post_id: &str) -> Option<CommentThread> {
        self.snapshots.get(post_id)
    }

    pub fn is_loading(&self, post_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(post_id)
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Drop one post's snapshot, or all of them.
    pub fn clear_cache(&self, post_id: Option<&str>) {
        match post_id {
            Some(id) => {
                self.snapshots.remove(id);
            }
            None => self.snapshots.clear(),
        }
    }
}

async fn run_fetch(
    adapter: Arc<dyn SourceAdapter>,
    snapshots: ThreadSnapshots,
    in_flight: InFlightMap,
    post_id: String,
    source: Source,
) -> Vec<Comment> {
    let native_id = source.native_id(&post_id).to_string();

    let comments = match adapter.get_thread(&native_id).await {
        Ok(thread) => {
            let comments = normalize_thread(&native_id, thread);
            debug!("Fetched {} comments for {}", comments.len(), post_id);
            snapshots.put(CommentThread::new(post_id.clone(), comments.clone()));
            comments
        }
        Err(e) => {
            warn!("Failed to fetch comments for {}: {}", post_id, e);
            snapshots
                .get(&post_id)
                .map(|thread| thread.comments)
                .unwrap_or_default()
        }
    };

    in_flight
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&post_id);
    comments
}

#[cfg(test)]
mod tests {
    use tokio::sync::Semaphore;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::adapter::mock::{post_at, MockAdapter};
    use crate::domain::{RawPost, RawThread};

    fn manager(fanfou: MockAdapter, mastodon: MockAdapter) -> (ThreadCacheManager, Arc<MockAdapter>, Arc<MockAdapter>) {
        let fanfou = Arc::new(fanfou);
        let mastodon = Arc::new(mastodon);
        let sources = Sources::new(fanfou.clone(), mastodon.clone());
        (ThreadCacheManager::new(sources), fanfou, mastodon)
    }

    fn split(ancestors: &[(&str, i64)], descendants: &[(&str, i64)]) -> RawThread {
        fn posts(entries: &[(&str, i64)]) -> Vec<RawPost> {
            entries
                .iter()
                .map(|(id, minute)| post_at(Source::Mastodon, id, *minute))
                .collect()
        }
        RawThread::Split {
            ancestors: posts(ancestors),
            descendants: posts(descendants),
        }
    }

    fn ids(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_split_thread_is_interleaved_by_time() {
        let (threads, _fanfou, mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));
        mastodon.set_thread("p", split(&[("t1", 1), ("t3", 3)], &[("t2", 2), ("t4", 4)]));

        let comments = threads.fetch_comments("mast_p", Source::Mastodon).await;
        assert_eq!(ids(&comments), vec!["mast_t1", "mast_t2", "mast_t3", "mast_t4"]);
        assert_eq!(threads.cached_comments("mast_p").unwrap(), comments);
    }

    #[tokio::test]
    async fn test_flat_thread_drops_the_post() {
        let (threads, fanfou, _mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));
        fanfou.set_thread(
            "root",
            RawThread::Flat(vec![
                post_at(Source::Fanfou, "r2", 20),
                post_at(Source::Fanfou, "root", 0),
                post_at(Source::Fanfou, "r1", 10),
            ]),
        );

        let comments = threads.fetch_comments("ff_root", Source::Fanfou).await;
        assert_eq!(ids(&comments), vec!["ff_r1", "ff_r2"]);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_call() {
        let gate = Arc::new(Semaphore::new(0));
        let (threads, _fanfou, mastodon) = manager(
            MockAdapter::new(Source::Fanfou),
            MockAdapter::new(Source::Mastodon).with_gate(gate.clone()),
        );
        mastodon.set_thread("p", split(&[("a", 1)], &[("b", 2)]));

        let (first, second, _) = tokio::join!(
            threads.fetch_comments("mast_p", Source::Mastodon),
            threads.fetch_comments("mast_p", Source::Mastodon),
            async {
                assert!(threads.is_loading("mast_p"));
                gate.add_permits(1);
            }
        );

        assert_eq!(mastodon.thread_calls(), 1);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(!threads.is_loading("mast_p"));
    }

    #[tokio::test]
    async fn test_sequential_fetches_refetch() {
        let (threads, _fanfou, mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));

        threads.fetch_comments("mast_p", Source::Mastodon).await;
        threads.fetch_comments("mast_p", Source::Mastodon).await;
        assert_eq!(mastodon.thread_calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_stale_snapshot() {
        let (threads, _fanfou, mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));
        mastodon.set_thread("p", split(&[], &[("b", 2)]));
        let fetched = threads.fetch_comments("mast_p", Source::Mastodon).await;

        mastodon.fail_threads(true);
        let stale = threads.fetch_comments("mast_p", Source::Mastodon).await;
        assert_eq!(stale, fetched);

        assert!(threads.fetch_comments("mast_q", Source::Mastodon).await.is_empty());
        assert!(threads.cached_comments("mast_q").is_none());
    }

    #[tokio::test]
    async fn test_send_comment_refetches() {
        let (threads, fanfou, _mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));

        let post = assert_ok!(
            threads
                .send_comment("ff_root", "nice", Source::Fanfou, Some("u1"))
                .await
        );
        assert!(post.id.starts_with("ff_"));
        assert_eq!(fanfou.thread_calls(), 1);
        assert!(!threads.is_sending());

        let draft = &fanfou.posted()[0];
        let target = draft.reply_to.as_ref().unwrap();
        assert_eq!(target.native_id, "root");
        assert_eq!(target.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_send_comment_refetches_after_earlier_fetch() {
        let gate = Arc::new(Semaphore::new(0));
        let (threads, _fanfou, mastodon) = manager(
            MockAdapter::new(Source::Fanfou),
            MockAdapter::new(Source::Mastodon).with_gate(gate.clone()),
        );
        mastodon.set_thread("p", split(&[], &[("b", 2)]));

        let (sent, fetched, _) = tokio::join!(
            threads.send_comment("mast_p", "late", Source::Mastodon, None),
            threads.fetch_comments("mast_p", Source::Mastodon),
            async {
                gate.add_permits(1);
                tokio::task::yield_now().await;
                gate.add_permits(5);
            }
        );

        assert_ok!(sent);
        assert_eq!(fetched.len(), 1);
        assert_eq!(mastodon.post_calls(), 1);
        assert_eq!(mastodon.thread_calls(), 2);
        assert!(!threads.is_loading("mast_p"));
    }

    #[tokio::test]
    async fn test_snapshot_records_fetch_time() {
        let (threads, _fanfou, mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));
        mastodon.set_thread("p", split(&[("a", 1)], &[]));
        assert!(threads.snapshot("mast_p").is_none());

        let before = chrono::Utc::now();
        threads.fetch_comments("mast_p", Source::Mastodon).await;

        let thread = threads.snapshot("mast_p").unwrap();
        assert_eq!(thread.post_id, "mast_p");
        assert_eq!(thread.comments.len(), 1);
        assert!(thread.fetched_at >= before);
    }

    #[tokio::test]
    async fn test_send_comment_failure_skips_refetch() {
        let (threads, fanfou, _mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));
        fanfou.fail_posts(true);

        assert_err!(
            threads
                .send_comment("ff_root", "nice", Source::Fanfou, None)
                .await
        );
        assert_eq!(fanfou.thread_calls(), 0);
        assert!(!threads.is_sending());
    }

    #[tokio::test]
    async fn test_send_empty_comment_is_rejected() {
        let (threads, fanfou, _mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));
        let err = threads
            .send_comment("ff_root", "   ", Source::Fanfou, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfluenceError::InvalidDraft(_)));
        assert_eq!(fanfou.calls(), 0);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let (threads, _fanfou, _mastodon) =
            manager(MockAdapter::new(Source::Fanfou), MockAdapter::new(Source::Mastodon));
        threads.fetch_comments("mast_a", Source::Mastodon).await;
        threads.fetch_comments("mast_b", Source::Mastodon).await;

        threads.clear_cache(Some("mast_a"));
        assert!(threads.cached_comments("mast_a").is_none());
        assert!(threads.cached_comments("mast_b").is_some());

        threads.clear_cache(None);
        assert!(threads.cached_comments("mast_b").is_none());
    }
}
