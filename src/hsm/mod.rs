//! Hierarchical state machine nodes.
//!
//! Applications implement [`Behavior`] for each level of the tree and wrap
//! it in a [`Machine`], attaching sub-machines to the states that own them.
//! The scheduler only ever sees the root as a boxed [`HsmNode`].

mod behavior;
mod context;
mod machine;

pub use behavior::{Behavior, Handled, HsmNode};
pub use context::Context;
pub use machine::Machine;
