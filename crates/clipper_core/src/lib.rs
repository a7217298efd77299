pub mod catalog;
pub mod error;
pub mod events;
pub mod player;
pub mod sequencer;
pub mod settings;
pub mod types;

pub use error::{CoreError, Result};
