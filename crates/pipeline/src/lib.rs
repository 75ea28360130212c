//! ClipCraft Pipeline
//!
//! Turns a watch URL into a rendered short: fetch the latest post, download
//! its media, probe, compose and encode. The same coordinator serves one-off
//! renders and scheduled runs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Scheduler (idle | armed, one run in flight)           │
//! │        │ tick                                         │
//! │        ▼                                              │
//! │ PipelineCoordinator                                   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────┐ ┌────────┐  │
//! │  │ Ingest     │ │ Downloader │ │ Probe  │ │ Encode │  │
//! │  │ Provider   │ │ (HTTP)     │ │ ×3     │ │        │  │
//! │  └────────────┘ └────────────┘ └────────┘ └────────┘  │
//! │        │ progress lines                               │
//! │        ▼                                              │
//! │   ProgressSink ──► subscribers                        │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod coordinator;
pub mod download;
pub mod ingest;
pub mod scheduler;

pub use coordinator::*;
pub use download::*;
pub use ingest::*;
pub use scheduler::*;
