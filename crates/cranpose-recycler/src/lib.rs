//! Holder recycling and update reconciliation for long, changing item lists.
//!
//! A display surface shows a window into a large ordered data set through a
//! small number of reusable [`Holder`]s. This crate decides which holder shows
//! which item:
//!
//! - [`Recycler`] owns every holder and serves positions from scrap, the
//!   working-set cache, the per-type [`RecycledPool`] or the data source.
//! - [`UpdateBatcher`] queues inserts, removals, moves and content changes
//!   until the next pass.
//! - [`RecyclerHost::dispatch_layout`] runs a pass: it applies queued edits,
//!   lets the [`ArrangementPolicy`] lay out (optionally twice, once against the
//!   old positions for predictive animations) and classifies every holder into
//!   a [`Disposition`] for the [`ItemAnimator`].
//!
//! Everything runs on the thread that owns the surface. Shared state uses
//! `Rc`/`RefCell` and none of the types are `Send` or `Sync`.

pub mod animator;
pub mod arrangement;
pub mod batcher;
pub mod cache;
pub mod collections;
pub mod config;
pub mod data_source;
pub mod disposition;
pub mod error;
pub mod holder;
pub mod host;
pub mod pool;
pub mod recycler;
pub mod scope;
pub mod scrap;
pub mod state;
pub mod update_op;

pub use animator::{AnimationKind, ItemAnimator};
pub use arrangement::ArrangementPolicy;
pub use batcher::{UpdateBatcher, UpdateTarget};
pub use cache::{WorkingSetCache, DEFAULT_CACHE_SIZE};
pub use config::RecyclerConfig;
pub use data_source::DataSource;
pub use disposition::{Disposition, LayoutReport};
pub use error::RecyclerError;
pub use holder::{Container, Holder, HolderFlags, HolderId, ItemBounds, ViewType};
pub use host::RecyclerHost;
pub use pool::{RecycledPool, SharedPool, DEFAULT_MAX_SCRAP};
pub use recycler::{CacheExtension, Recycler};
pub use scope::LayoutScope;
pub use scrap::{ScrapGroup, ScrapSet};
pub use state::{LayoutPhase, LayoutState};
pub use update_op::{UpdateKind, UpdateOp};
