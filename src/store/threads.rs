use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::CommentThread;

/// In-memory comment-thread snapshots keyed by global post id.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct ThreadSnapshots {
    inner: Arc<Mutex<HashMap<String, CommentThread>>>,
}

impl ThreadSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CommentThread>> {
        // Snapshots are derived data, a poisoned map is still usable
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, post_id: &str) -> Option<CommentThread> {
        self.lock().get(post_id).cloned()
    }

    /// Replace the snapshot for `thread.post_id`.
    pub fn put(&self, thread: CommentThread) {
        self.lock().insert(thread.post_id.clone(), thread);
    }

    pub fn remove(&self, post_id: &str) -> Option<CommentThread> {
        self.lock().remove(post_id)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let snapshots = ThreadSnapshots::new();
        snapshots.put(CommentThread::new("ff_1".into(), Vec::new()));
        assert!(snapshots.get("ff_1").is_some());
        assert!(snapshots.get("ff_2").is_none());

        assert!(snapshots.remove("ff_1").is_some());
        assert!(snapshots.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let a = ThreadSnapshots::new();
        let b = a.clone();
        a.put(CommentThread::new("mast_1".into(), Vec::new()));
        a.put(CommentThread::new("mast_2".into(), Vec::new()));
        assert_eq!(b.len(), 2);

        b.clear();
        assert!(a.is_empty());
    }
}
