//! Driver selection policies for the matching tick.

pub mod policy;
pub mod proximity_first;

pub use policy::{Candidate, Selection, SelectionPolicy};
pub use proximity_first::ProximityFirst;
