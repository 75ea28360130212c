//! ClipCraft Render Engine
//!
//! Composes a vertical short from a background clip, a post screenshot,
//! an optional overlay video and a caption, by driving external media tools.
//!
//! # Pipeline Architecture
//!
//! ```text
//! background.mp4 ──┐
//!                  ├── Scale to canvas, setsar=1      [bg]
//! screenshot.png ──┘         │
//!                            ├── Contain-scale + anchor overlay   [lay1]
//! overlay.mp4 (optional) ────┘         │
//!                                      ├── Contain-scale + anchor overlay   [lay2]
//! caption text ────────────────────────┘         │
//!                                                ├── Caption box (drawtext)   [out]
//!                                                ▼
//!                                         Encode (H.264)
//!                                                │
//!                                                ▼
//!                                          output_<ms>.mp4
//! ```
//!
//! Dimensions come from `ffprobe` ([`probe`]); the graph is built by
//! [`filter_graph`] using [`geometry`]; `ffmpeg` runs it ([`encode`]).

pub mod encode;
pub mod filter_graph;
pub mod geometry;
pub mod probe;
pub mod tool;

pub use encode::*;
pub use filter_graph::*;
pub use geometry::*;
pub use probe::*;
pub use tool::*;
