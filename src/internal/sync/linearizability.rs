//! Checks recorded concurrent histories for linearizability.
//!
//! Every thread logs the invocation and response time of each of its calls against
//! a global clock. Histories are then split by key, since a history is linearizable
//! exactly when each of its per-key sub histories is, and each sub history is
//! searched for a legal sequential order the way Wing and Gong do: repeatedly pick a
//! pending call that was invoked before every other pending call returned, apply it
//! to a model register and backtrack when the observed result disagrees.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{Config, OrderedIndex, Result, SkipList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Insert(u64),
    Remove,
    Get,
}

#[derive(Debug, Clone)]
struct Call {
    key: u8,
    op: Op,
    /// The value the call returned or replaced.
    observed: Option<u64>,
    invoked: u64,
    returned: u64,
}

/// A sequentially consistent reference model.
struct Locked(Mutex<BTreeMap<u8, u64>>);

impl OrderedIndex<u8, u64> for Locked {
    fn insert(&self, key: u8, val: u64) -> Result<Option<u64>> {
        Ok(self.0.lock().unwrap().insert(key, val))
    }

    fn get_value(&self, key: &u8) -> Option<u64> {
        self.0.lock().unwrap().get(key).copied()
    }

    fn remove(&self, key: &u8) -> Result<Option<u64>> {
        Ok(self.0.lock().unwrap().remove(key))
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Runs `threads` workers doing `ops` random calls each on a small key space, and
/// returns everything they observed.
fn record<I>(index: &Arc<I>, threads: usize, ops: usize) -> Vec<Call>
where
    I: OrderedIndex<u8, u64> + Send + Sync + 'static,
{
    let clock = Arc::new(AtomicU64::new(0));
    // Values are unique, so every observation points at exactly one insert.
    let values = Arc::new(AtomicUsize::new(1));

    let handles = (0..threads)
        .map(|seed| {
            let index = index.clone();
            let clock = clock.clone();
            let values = values.clone();

            std::thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed as u64);
                let mut calls = Vec::with_capacity(ops);

                for _ in 0..ops {
                    let key = rng.gen_range(0..4u8);
                    let op = match rng.gen_range(0..3) {
                        0 => Op::Insert(values.fetch_add(1, Ordering::Relaxed) as u64),
                        1 => Op::Remove,
                        _ => Op::Get,
                    };

                    let invoked = clock.fetch_add(1, Ordering::SeqCst);
                    let observed = match op {
                        Op::Insert(val) => index.insert(key, val).unwrap(),
                        Op::Remove => index.remove(&key).unwrap(),
                        Op::Get => index.get_value(&key),
                    };
                    let returned = clock.fetch_add(1, Ordering::SeqCst);

                    calls.push(Call {
                        key,
                        op,
                        observed,
                        invoked,
                        returned,
                    });
                }

                calls
            })
        })
        .collect::<Vec<_>>();

    handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect()
}

/// Searches for a legal order of `calls`, which all touch the same key.
fn linearizable(calls: &[Call]) -> bool {
    assert!(calls.len() < 128, "sub history too long for the search");

    let all: u128 = (1 << calls.len()) - 1;

    let mut dead_ends = HashSet::new();

    fn search(
        calls: &[Call],
        done: u128,
        all: u128,
        state: Option<u64>,
        dead_ends: &mut HashSet<(u128, Option<u64>)>,
    ) -> bool {
        if done == all {
            return true;
        }

        if dead_ends.contains(&(done, state)) {
            return false;
        }

        // A call can go next only if it was invoked before every pending call returned.
        let deadline = (0..calls.len())
            .filter(|i| done & (1 << i) == 0)
            .map(|i| calls[i].returned)
            .min()
            .unwrap_or(u64::MAX);

        for (i, call) in calls.iter().enumerate() {
            if done & (1 << i) != 0 || call.invoked > deadline {
                continue;
            }

            if call.observed != state {
                continue;
            }

            let next = match call.op {
                Op::Insert(val) => Some(val),
                Op::Remove => None,
                Op::Get => state,
            };

            if search(calls, done | (1 << i), all, next, dead_ends) {
                return true;
            }
        }

        dead_ends.insert((done, state));
        false
    }

    search(calls, 0, all, None, &mut dead_ends)
}

fn check<I>(index: Arc<I>)
where
    I: OrderedIndex<u8, u64> + Send + Sync + 'static,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let history = record(&index, 4, 60);

    let mut by_key: HashMap<u8, Vec<Call>> = HashMap::new();
    for call in history {
        by_key.entry(call.key).or_default().push(call);
    }

    for (key, calls) in &by_key {
        assert!(linearizable(calls), "history of key {} is not linearizable", key);

        // Whatever is left must be what the last legal order ends on.
        let mut tail = calls.clone();
        tail.push(Call {
            key: *key,
            op: Op::Get,
            observed: index.get_value(key),
            invoked: u64::MAX - 1,
            returned: u64::MAX,
        });
        assert!(linearizable(&tail), "final state of key {} is not reachable", key);
    }
}

#[test]
fn test_linearizable_reference_model() {
    check(Arc::new(Locked(Mutex::new(BTreeMap::new()))));
}

#[test]
fn test_linearizable_skiplist() {
    for _ in 0..20 {
        let list = SkipList::with_config(Config::default().max_level(4).retry_budget(usize::MAX))
            .unwrap();
        check(Arc::new(list));
    }
}

#[test]
fn test_rejects_stale_read() {
    let calls = vec![
        Call {
            key: 0,
            op: Op::Insert(1),
            observed: None,
            invoked: 0,
            returned: 1,
        },
        Call {
            key: 0,
            op: Op::Get,
            observed: None,
            invoked: 2,
            returned: 3,
        },
    ];

    assert!(!linearizable(&calls));
}

#[test]
fn test_accepts_overlapping_calls() {
    let calls = vec![
        Call {
            key: 0,
            op: Op::Insert(1),
            observed: None,
            invoked: 0,
            returned: 3,
        },
        Call {
            key: 0,
            op: Op::Get,
            observed: Some(1),
            invoked: 1,
            returned: 2,
        },
    ];

    assert!(linearizable(&calls));
}
