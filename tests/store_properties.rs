// tests/store_properties.rs
// Randomised apply sequences checked against a straightforward model, plus a
// concurrent writer/reader check of snapshot atomicity.
mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use common::post;
use rand::{
    rngs::StdRng,
    seq::{IndexedRandom, SliceRandom},
    Rng, SeedableRng,
};
use subreddit_tracker::{AggregateStore, Post};

const TITLES: &[&str] = &["rust 2024", "async traits", "borrowck", "gc pauses", "zero cost"];
const AUTHORS: &[&str] = &["alice", "bob", "carol", "dave"];

fn random_posts(rng: &mut StdRng, n: usize) -> Vec<Post> {
    (0..n)
        .map(|_| {
            let title = TITLES.choose(rng).unwrap();
            let author = AUTHORS.choose(rng).unwrap();
            post(title, author, rng.random_range(-20..200))
        })
        .collect()
}

#[test]
fn counts_max_scores_and_order_hold_for_random_sequences() {
    for seed in 0..25u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let posts = random_posts(&mut rng, 200);
        let store = AggregateStore::new();

        let mut expected_counts: HashMap<String, u64> = HashMap::new();
        let mut best: HashMap<(String, String), i64> = HashMap::new();
        let mut first_seen: Vec<(String, String)> = Vec::new();

        for p in &posts {
            store.apply(p.clone());
            *expected_counts.entry(p.author.clone()).or_default() += 1;
            let key = (p.title.clone(), p.author.clone());
            if !best.contains_key(&key) {
                first_seen.push(key.clone());
            }
            let e = best.entry(key).or_insert(p.upvotes);
            *e = (*e).max(p.upvotes);
        }

        let snap = store.snapshot();

        // every observation counts, duplicates included
        for (author, n) in &expected_counts {
            assert_eq!(snap.posts_by(author), *n, "seed {seed}");
        }
        assert_eq!(snap.user_posts.len(), expected_counts.len());

        // one entry per key, carrying the max score
        assert_eq!(snap.top_posts.len(), best.len(), "seed {seed}");
        for p in &snap.top_posts {
            assert_eq!(best[&(p.title.clone(), p.author.clone())], p.upvotes);
        }

        // descending; ties in first-seen order
        for w in snap.top_posts.windows(2) {
            assert!(w[0].upvotes >= w[1].upvotes, "seed {seed}");
            if w[0].upvotes == w[1].upvotes {
                let pos = |p: &Post| {
                    first_seen
                        .iter()
                        .position(|(t, a)| *t == p.title && *a == p.author)
                        .unwrap()
                };
                assert!(pos(&w[0]) < pos(&w[1]), "seed {seed}");
            }
        }
    }
}

#[test]
fn arrival_order_only_affects_ties() {
    let mut rng = StdRng::seed_from_u64(7);
    // unique scores, so the ranking is fully determined by content
    let mut posts: Vec<Post> = (0..40)
        .map(|i| post(&format!("t{i}"), AUTHORS[i % AUTHORS.len()], i as i64 * 3))
        .collect();

    let a = AggregateStore::new();
    for p in &posts {
        a.apply(p.clone());
    }
    posts.shuffle(&mut rng);
    let b = AggregateStore::new();
    for p in &posts {
        b.apply(p.clone());
    }

    assert_eq!(a.snapshot().top_posts, b.snapshot().top_posts);
    assert_eq!(a.snapshot().top_users(), b.snapshot().top_users());
}

#[test]
fn snapshots_never_see_half_an_apply() {
    let store = Arc::new(AggregateStore::new());
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..2_000 {
                    // every post is a new key: each apply adds exactly one count and one entry
                    store.apply(post(&format!("w{w}-{i}"), AUTHORS[i % AUTHORS.len()], i as i64));
                }
            })
        })
        .collect();

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let mut checked = 0;
            loop {
                let snap = store.snapshot();
                let counted: u64 = snap.user_posts.values().sum();
                assert_eq!(counted, snap.top_posts.len() as u64);
                checked += 1;
                if snap.top_posts.len() == 8_000 {
                    return checked;
                }
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    assert!(reader.join().unwrap() > 0);
}
