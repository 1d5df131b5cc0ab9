//! Macros for declaring node states and application signals.

/// Generate a State trait implementation for a simple enum.
///
/// The enum derives `Clone`, `PartialEq`, `Debug` and serde, and names one
/// variant as its pseudo-initial state.
///
/// # Example
///
/// ```
/// use tickstate::core::State;
/// use tickstate::state_enum;
///
/// state_enum! {
///     pub enum ArmState {
///         InitPState,
///         Raised,
///         Lowered,
///     }
///     pseudo_initial: InitPState
/// }
///
/// assert_eq!(ArmState::Raised.name(), "Raised");
/// assert!(ArmState::InitPState.is_pseudo_initial());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        pseudo_initial: $initial:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn pseudo_initial() -> Self {
                Self::$initial
            }
        }
    };
}

/// Generate a Signal trait implementation for a fieldless enum.
///
/// # Example
///
/// ```
/// use tickstate::core::Signal;
/// use tickstate::signal_enum;
///
/// signal_enum! {
///     pub enum ArmSignal {
///         Raise,
///         Lower,
///     }
/// }
///
/// assert_eq!(ArmSignal::Lower.name(), "Lower");
/// ```
#[macro_export]
macro_rules! signal_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::Signal for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
