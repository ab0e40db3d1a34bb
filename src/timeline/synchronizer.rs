use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures::future::join_all;
use tracing::{info, warn};

use crate::adapter::Sources;
use crate::app::flight::InFlight;
use crate::domain::{Post, RawPost, Source, TimelineFilter};
use crate::timeline::state::TimelineState;

/// What one source contributed to a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: Source,
    /// Posts the backend returned
    pub fetched: usize,
    /// Posts not held before
    pub added: usize,
    pub exhausted: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Another load was running; nothing was fetched.
    AlreadyLoading,
    /// Every included, signed-in source is exhausted.
    NothingToLoad,
    /// `set_filter` was given the current filter.
    FilterUnchanged,
    Loaded(Vec<SourceReport>),
}

/// Merges both home timelines into one feed.
pub struct TimelineSynchronizer {
    sources: Sources,
    page_size: usize,
    state: Mutex<TimelineState>,
    loading: AtomicBool,
}

impl TimelineSynchronizer {
    pub fn new(sources: Sources, page_size: usize) -> Self {
        Self {
            sources,
            page_size: page_size.max(1),
            state: Mutex::new(TimelineState::default()),
            loading: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, TimelineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the next page from every source that still has one.
    pub async fn load(&self) -> LoadOutcome {
        let Some(_guard) = InFlight::acquire(&self.loading) else {
            return LoadOutcome::AlreadyLoading;
        };

        let plan: Vec<(Source, Option<String>)> = {
            let state = self.state();
            Source::ALL
                .into_iter()
                .filter(|&source| {
                    state.filter.includes(source)
                        && !state.source(source).exhausted
                        && self.sources.get(source).is_authenticated()
                })
                .map(|source| (source, state.next_cursor(source)))
                .collect()
        };

        if plan.is_empty() {
            return LoadOutcome::NothingToLoad;
        }

        let fetches = plan.iter().map(|(source, cursor)| {
            let adapter = self.sources.get(*source).clone();
            let page_size = self.page_size;
            async move { adapter.list_timeline(cursor.as_deref(), page_size).await }
        });
        let results = join_all(fetches).await;

        let mut state = self.state();
        let reports = plan
            .into_iter()
            .zip(results)
            .map(|((source, cursor), result)| match result {
                Ok(page) => {
                    let fetched = page.len();
                    let posts = to_posts(page);
                    let entry = state.source_mut(source);

                    let added = match cursor {
                        None => entry.merge_fresh(posts),
                        Some(_) => entry.merge_page(posts),
                    };
                    entry.fresh = false;
                    if fetched < self.page_size {
                        entry.exhausted = true;
                    }

                    info!("Loaded {} posts from {} ({} new)", fetched, source, added);
                    SourceReport {
                        source,
                        fetched,
                        added,
                        exhausted: entry.exhausted,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("Failed to load {} timeline: {}", source, e);
                    SourceReport {
                        source,
                        fetched: 0,
                        added: 0,
                        exhausted: state.source(source).exhausted,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        LoadOutcome::Loaded(reports)
    }

    /// Advance to the next page and load it.
    pub async fn load_more(&self) -> LoadOutcome {
        self.state().page += 1;
        self.load().await
    }

    /// Change which sources are shown and reload from the first page.
    pub async fn set_filter(&self, filter: TimelineFilter) -> LoadOutcome {
        {
            let mut state = self.state();
            if state.filter == filter {
                return LoadOutcome::FilterUnchanged;
            }
            state.apply_filter(filter);
        }
        self.load().await
    }

    /// Posts of the included sources, newest first.
    pub fn merged_view(&self) -> Vec<Post> {
        self.state().merged_view()
    }

    pub fn filter(&self) -> TimelineFilter {
        self.state().filter
    }

    pub fn page(&self) -> usize {
        self.state().page
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn is_exhausted(&self, source: Source) -> bool {
        self.state().source(source).exhausted
    }

    /// Whether any included, signed-in source can still be paged.
    pub fn has_more(&self) -> bool {
        let state = self.state();
        Source::ALL.into_iter().any(|source| {
            state.filter.includes(source)
                && !state.source(source).exhausted
                && self.sources.get(source).is_authenticated()
        })
    }
}

fn to_posts(page: Vec<RawPost>) -> Vec<Post> {
    page.into_iter()
        .filter_map(|raw| {
            let id = raw.native_id().to_string();
            match Post::from_raw(raw) {
                Ok(post) => Some(post),
                Err(e) => {
                    warn!("Skipping post {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}
