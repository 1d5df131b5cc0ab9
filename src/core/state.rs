//! State trait for the states of one hierarchy level.
//!
//! Every node in the tree owns a flat enumeration of states. Exactly one
//! variant is the pseudo-initial state: the node sits there between
//! construction (or reset) and its first `Init` event, and never returns to
//! it through a transition.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for the states of a single HSM node.
///
/// All methods are pure - no side effects. States are plain values; a
/// node's `current_state` only changes through the transition protocol.
///
/// # Required Traits
///
/// - `Clone`: States are copied into the transition history
/// - `PartialEq`: Self-transitions are detected by comparison
/// - `Debug`: States are debuggable for diagnostics
/// - `Serialize` + `Deserialize`: Transition traces can be exported
///
/// # Example
///
/// ```rust
/// use tickstate::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum DoorState {
///     InitPState,
///     Closed,
///     Open,
/// }
///
/// impl State for DoorState {
///     fn name(&self) -> &str {
///         match self {
///             Self::InitPState => "InitPState",
///             Self::Closed => "Closed",
///             Self::Open => "Open",
///         }
///     }
///
///     fn pseudo_initial() -> Self {
///         Self::InitPState
///     }
/// }
///
/// assert!(DoorState::InitPState.is_pseudo_initial());
/// assert!(!DoorState::Open.is_pseudo_initial());
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// The pseudo-initial state this node starts in.
    fn pseudo_initial() -> Self;

    /// Check if this is the pseudo-initial state.
    ///
    /// Default implementation compares against [`State::pseudo_initial`].
    fn is_pseudo_initial(&self) -> bool {
        *self == Self::pseudo_initial()
    }
}
