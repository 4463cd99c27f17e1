pub mod automatan;
pub mod loader;

pub use automatan::{
    BuildError, RunError, StateId,
    dfa::{Added, Dfa, State},
    trace::{RunEvent, RunObserver, Trace},
};
pub use loader::{Layout, Loaded, Options, load};
