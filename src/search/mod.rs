//! Live product search for the hero dropdown and the results page.

mod engine;
mod state;

pub use engine::{SearchEngine, SearchSettings};
pub use state::{ResultSection, SearchState, Surface};
