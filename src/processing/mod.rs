//! # Processing Module
//!
//! Turns a captured photo into the payload the grading service receives.

pub mod orientation;
pub mod processing;

pub use orientation::{Orientation, read_exif_orientation};
pub use processing::{EncodedImage, Preprocessor};
