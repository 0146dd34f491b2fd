//! Testing utilities and harness for cranpose-recycler

pub mod animator;
pub mod arrangement;
pub mod data;
pub mod rule;

pub use animator::{AnimationRequest, RecordingAnimator};
pub use arrangement::LinearArrangement;
pub use data::{TestDataSource, TestItem, TestView};
pub use rule::{run_test_recycler, RecyclerTestRule};

pub mod prelude {
    pub use crate::animator::*;
    pub use crate::arrangement::*;
    pub use crate::data::*;
    pub use crate::rule::*;
}
