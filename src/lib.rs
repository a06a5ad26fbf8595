//! Sleepviz - On-device compute engine for sleep and caffeine survey visualizations
//!
//! Sleepviz turns survey rows into a categorical heatmap through a
//! deterministic pipeline: CSV loading → categorization → age filtering →
//! dense aggregation → SVG rendering. It also scores the five-factor
//! "sleep score" widget.
//!
//! ## Modules
//!
//! - **Heatmap**: sleep duration × caffeine intake grid of trouble-sleeping rates
//! - **Sleep score**: additive risk table over five lifestyle factors

pub mod aggregator;
pub mod categorizer;
pub mod color;
pub mod error;
pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod render;
pub mod score;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::aggregate;
pub use error::VizError;
pub use filter::{AgeOption, FilterEvent, FilterState};
pub use loader::{Dataset, DatasetLoader};
pub use pipeline::{csv_to_heatmap, csv_to_heatmap_svg, HeatmapProcessor};
pub use render::{HeatmapRenderer, RenderConfig};
pub use score::{Factor, FactorLevels, ScoreEvent};

/// Sleepviz version embedded in all snapshots
pub const VIZ_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for snapshots
pub const PRODUCER_NAME: &str = "sleepviz";
