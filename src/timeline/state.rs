use std::collections::HashSet;

use crate::domain::{Post, Source, TimelineFilter};

/// Everything held for one source.
#[derive(Debug, Clone)]
pub struct SourceState {
    /// Newest-seen first. No two items share a `native_id`.
    pub items: Vec<Post>,
    /// Last fetch came back short. Cleared only by a filter change.
    pub exhausted: bool,
    /// Next fetch goes without a cursor.
    pub fresh: bool,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            exhausted: false,
            fresh: true,
        }
    }
}

impl SourceState {
    /// Native id of the oldest held item.
    pub fn cursor(&self) -> Option<&str> {
        self.items
            .iter()
            .rev()
            .min_by_key(|post| post.created_at)
            .map(|post| post.native_id.as_str())
    }

    /// Merge a page fetched without a cursor.
    ///
    /// Posts already held are replaced in place; unseen posts go in front,
    /// in page order. Returns the number of new posts.
    pub fn merge_fresh(&mut self, page: Vec<Post>) -> usize {
        let mut incoming = Vec::new();
        let mut seen = HashSet::new();

        for post in page {
            if !seen.insert(post.native_id.clone()) {
                continue;
            }
            match self
                .items
                .iter_mut()
                .find(|held| held.native_id == post.native_id)
            {
                Some(held) => *held = post,
                None => incoming.push(post),
            }
        }

        let added = incoming.len();
        incoming.append(&mut self.items);
        self.items = incoming;
        added
    }

    /// Merge a page fetched with a cursor. Only unseen posts are appended.
    pub fn merge_page(&mut self, page: Vec<Post>) -> usize {
        let mut held: HashSet<String> = self
            .items
            .iter()
            .map(|post| post.native_id.clone())
            .collect();

        let before = self.items.len();
        for post in page {
            if held.insert(post.native_id.clone()) {
                self.items.push(post);
            }
        }
        self.items.len() - before
    }
}

#[derive(Debug, Clone)]
pub struct TimelineState {
    pub filter: TimelineFilter,
    /// 1-based. Page 1 always fetches without a cursor.
    pub page: usize,
    fanfou: SourceState,
    mastodon: SourceState,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            filter: TimelineFilter::All,
            page: 1,
            fanfou: SourceState::default(),
            mastodon: SourceState::default(),
        }
    }
}

impl TimelineState {
    pub fn source(&self, source: Source) -> &SourceState {
        match source {
            Source::Fanfou => &self.fanfou,
            Source::Mastodon => &self.mastodon,
        }
    }

    pub fn source_mut(&mut self, source: Source) -> &mut SourceState {
        match source {
            Source::Fanfou => &mut self.fanfou,
            Source::Mastodon => &mut self.mastodon,
        }
    }

    /// Cursor for the next fetch from `source`.
    pub fn next_cursor(&self, source: Source) -> Option<String> {
        let state = self.source(source);
        if self.page == 1 || state.fresh {
            return None;
        }
        state.cursor().map(String::from)
    }

    /// Switch filters. Newly included sources fetch fresh; every source may
    /// be fetched again.
    pub fn apply_filter(&mut self, filter: TimelineFilter) {
        let previous = self.filter;
        self.filter = filter;
        self.page = 1;

        for source in Source::ALL {
            let state = self.source_mut(source);
            state.exhausted = false;
            if filter.includes(source) && !previous.includes(source) {
                state.fresh = true;
            }
        }
    }

    /// Included sources' items, newest first. Ties keep Fanfou ahead of
    /// Mastodon and each source's own order.
    pub fn merged_view(&self) -> Vec<Post> {
        let mut merged: Vec<Post> = Source::ALL
            .into_iter()
            .filter(|source| self.filter.includes(*source))
            .flat_map(|source| self.source(source).items.iter().cloned())
            .collect();

        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        merged
    }
}
