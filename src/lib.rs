//! A concurrent, ordered in-memory index.
//!
//! The purpose of this crate is to provide the mutable write buffer of a
//! log-structured storage engine: a skip list that many threads read, scan and
//! modify at once. Readers never block; writers lock only the few nodes they splice.
//!
//! ```
//! use skipindex::SkipList;
//!
//! let list = SkipList::new();
//!
//! list.insert(1, "a").unwrap();
//! list.insert(5, "b").unwrap();
//! list.insert(3, "c").unwrap();
//! list.remove(&3).unwrap();
//!
//! let keys = list.scan(None).map(|e| *e.key()).collect::<Vec<_>>();
//! assert_eq!(keys, vec![1, 5]);
//! assert_eq!(list.len(), 2);
//! ```
#![warn(
    // missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
pub mod config;
pub mod error;
pub mod level;
pub mod skiplist;

mod internal;

pub use config::Config;
pub use error::{Error, Result};
pub use internal::sync::iter::{IntoIter, Iter, Range};
pub use internal::sync::{Entry, SkipList};
pub use level::{Geometric, LevelGenerator};
pub use skiplist::OrderedIndex;
