pub mod common;
pub mod generation;
pub mod history;
pub mod presets;

pub use common::*;
pub use generation::*;
pub use history::*;
pub use presets::{Dimension, DurationPreset, SizePreset};
