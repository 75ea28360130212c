//! ClipCraft Data Model
//!
//! Defines the data contracts shared by the composition pipeline:
//! - **Dimensions:** Pixel sizes of media and their scaled placements
//! - **Post:** The ingested post (caption, screenshot, optional clip)
//! - **Settings:** Persisted application settings, including render style
//!
//! Everything here is plain data. Computation lives in the render engine.

pub mod dimensions;
pub mod post;
pub mod settings;

pub use dimensions::*;
pub use post::*;
pub use settings::*;
