pub mod mpv;

pub use mpv::{EventTranslator, Geometry, MpvEventStream, MpvPlayer};
