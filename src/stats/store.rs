//! # Aggregate store
//! Per-author post counts plus a deduplicated, score-ordered list of posts,
//! guarded together by one mutex so a snapshot never sees half of an `apply`.
//!
//! Ordering: descending by upvotes; equal scores keep first-seen order. An
//! entry whose score is raised by a duplicate keeps its original position in
//! that first-seen sequence.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};

use crate::ingest::types::Post;

/// Thread-safe aggregate of everything the workers have applied.
#[derive(Debug, Default)]
pub struct AggregateStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    user_posts: HashMap<String, u64>,
    /// Sorted by `(upvotes desc, seq asc)`.
    top_posts: Vec<Ranked>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct Ranked {
    seq: u64,
    post: Post,
}

/// What one `apply` did to the ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Raised,
    Unchanged,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // `apply` never panics between its two updates, so a poisoned guard
        // still holds consistent state.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Count the post against its author and fold it into the ranked list.
    pub fn apply(&self, post: Post) -> ApplyOutcome {
        let mut inner = self.lock();

        *inner.user_posts.entry(post.author.clone()).or_insert(0) += 1;

        if let Some(idx) = inner.top_posts.iter().position(|r| r.post.same_key(&post)) {
            if post.upvotes <= inner.top_posts[idx].post.upvotes {
                return ApplyOutcome::Unchanged;
            }
            inner.top_posts[idx].post.upvotes = post.upvotes;
            inner.resort();
            return ApplyOutcome::Raised;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.top_posts.push(Ranked { seq, post });
        inner.resort();
        ApplyOutcome::Inserted
    }

    /// Point-in-time copy of both collections, taken under the same lock.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            user_posts: inner.user_posts.clone(),
            top_posts: inner.top_posts.iter().map(|r| r.post.clone()).collect(),
            taken_at: Utc::now(),
        }
    }

    pub fn tracked_posts(&self) -> usize {
        self.lock().top_posts.len()
    }
}

impl Inner {
    fn resort(&mut self) {
        self.top_posts.sort_by(|a, b| {
            b.post
                .upvotes
                .cmp(&a.post.upvotes)
                .then_with(|| a.seq.cmp(&b.seq))
        });
    }
}

/// Consistent copy of the store, safe to inspect without holding any lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub user_posts: HashMap<String, u64>,
    pub top_posts: Vec<Post>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Authors by post count, highest first; ties by name for stable output.
    pub fn top_users(&self) -> Vec<(String, u64)> {
        let mut users: Vec<(String, u64)> = self
            .user_posts
            .iter()
            .map(|(author, n)| (author.clone(), *n))
            .collect();
        users.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        users
    }

    /// The first `k` posts; the list is already ranked.
    pub fn top_posts(&self, k: usize) -> &[Post] {
        &self.top_posts[..self.top_posts.len().min(k)]
    }

    pub fn posts_by(&self, author: &str) -> u64 {
        self.user_posts.get(author).copied().unwrap_or(0)
    }
}
