//! Scripted adapter for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Map;
use tokio::sync::Semaphore;

use crate::adapter::SourceAdapter;
use crate::app::{ConfluenceError, Result};
use crate::domain::post::FANFOU_DATE_FORMAT;
use crate::domain::raw::{FanfouStatus, MastodonStatus};
use crate::domain::{PostDraft, RawPost, RawThread, Source};

/// A post `minute` minutes after a fixed epoch, in the source's own date
/// encoding.
pub fn post_at(source: Source, id: &str, minute: i64) -> RawPost {
    let at = base_time() + Duration::minutes(minute);
    raw_post(source, id, at)
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 9, 0, 0, 0).unwrap()
}

pub fn raw_post(source: Source, id: &str, at: DateTime<Utc>) -> RawPost {
    match source {
        Source::Fanfou => RawPost::Fanfou(FanfouStatus {
            id: id.to_string(),
            created_at: at.format(FANFOU_DATE_FORMAT).to_string(),
            text: format!("fanfou {}", id),
            user: None,
            photo: None,
            extra: Map::new(),
        }),
        Source::Mastodon => RawPost::Mastodon(MastodonStatus {
            id: id.to_string(),
            created_at: at.to_rfc3339(),
            content: format!("<p>mastodon {}</p>", id),
            account: None,
            media_attachments: Vec::new(),
            reblog: None,
            extra: Map::new(),
        }),
    }
}

enum Scripted {
    Page(Vec<RawPost>),
    Fail(String),
}

pub struct MockAdapter {
    source: Source,
    authenticated: AtomicBool,
    pages: Mutex<VecDeque<Scripted>>,
    threads: Mutex<HashMap<String, RawThread>>,
    fail_threads: AtomicBool,
    fail_posts: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    cursors: Mutex<Vec<Option<String>>>,
    posted: Mutex<Vec<PostDraft>>,
    list_calls: AtomicUsize,
    thread_calls: AtomicUsize,
    post_calls: AtomicUsize,
}

impl MockAdapter {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            authenticated: AtomicBool::new(true),
            pages: Mutex::new(VecDeque::new()),
            threads: Mutex::new(HashMap::new()),
            fail_threads: AtomicBool::new(false),
            fail_posts: AtomicBool::new(false),
            gate: None,
            cursors: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            thread_calls: AtomicUsize::new(0),
            post_calls: AtomicUsize::new(0),
        }
    }

    /// Every call waits for a permit on `gate` after being counted.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn signed_out(self) -> Self {
        self.authenticated.store(false, Ordering::SeqCst);
        self
    }

    /// Queue the next timeline page. An empty queue answers empty pages.
    pub fn push_page(&self, posts: Vec<RawPost>) {
        self.pages.lock().unwrap().push_back(Scripted::Page(posts));
    }

    pub fn push_failure(&self, message: &str) {
        self.pages
            .lock()
            .unwrap()
            .push_back(Scripted::Fail(message.to_string()));
    }

    pub fn set_thread(&self, native_id: &str, thread: RawThread) {
        self.threads
            .lock()
            .unwrap()
            .insert(native_id.to_string(), thread);
    }

    pub fn fail_threads(&self, fail: bool) {
        self.fail_threads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }

    pub fn posted(&self) -> Vec<PostDraft> {
        self.posted.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn thread_calls(&self) -> usize {
        self.thread_calls.load(Ordering::SeqCst)
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    /// Calls of any kind.
    pub fn calls(&self) -> usize {
        self.list_calls() + self.thread_calls() + self.post_calls()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
    }

    fn failure(&self, message: String) -> ConfluenceError {
        ConfluenceError::SourceFetch {
            backend: self.source,
            message,
        }
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn source(&self) -> Source {
        self.source
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn list_timeline(&self, cursor: Option<&str>, page_size: usize) -> Result<Vec<RawPost>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.cursors.lock().unwrap().push(cursor.map(String::from));
        self.pass_gate().await;

        let next = self.pages.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Page(mut posts)) => {
                posts.truncate(page_size);
                Ok(posts)
            }
            Some(Scripted::Fail(message)) => Err(self.failure(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn get_thread(&self, native_id: &str) -> Result<RawThread> {
        self.thread_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;

        if self.fail_threads.load(Ordering::SeqCst) {
            return Err(self.failure(format!("thread {} unavailable", native_id)));
        }

        let thread = self.threads.lock().unwrap().get(native_id).cloned();
        Ok(thread.unwrap_or_else(|| match self.source {
            Source::Fanfou => RawThread::Flat(Vec::new()),
            Source::Mastodon => RawThread::Split {
                ancestors: Vec::new(),
                descendants: Vec::new(),
            },
        }))
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<RawPost> {
        let n = self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;

        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(self.failure("rejected".into()));
        }

        self.posted.lock().unwrap().push(draft.clone());
        Ok(post_at(self.source, &format!("posted-{}", n), 10_000 + n as i64))
    }
}
