//! Hash container aliases used by the recycler.
//!
//! The default build hashes with `rustc-hash`; enabling the `std-hash`
//! feature falls back to the standard library hasher.

use smallvec::SmallVec;

use crate::holder::HolderId;

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::hash_map::Entry;
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
    pub use std::collections::hash_map::Entry;
}

/// Short-lived buffer of holder ids collected while sweeping a container.
///
/// Sweeps usually touch a handful of on-screen holders, so the ids stay inline.
pub(crate) type IdBuffer = SmallVec<[HolderId; 16]>;
