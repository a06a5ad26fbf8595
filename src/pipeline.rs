//! Pipeline orchestration
//!
//! This module provides the public API for sleepviz heatmaps.
//! It runs the full pipeline from raw CSV to a rendered grid.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregator::aggregate;
use crate::error::VizError;
use crate::filter::{AgeOption, FilterEvent, FilterState};
use crate::loader::{Dataset, DatasetLoader, DatasetSource, LoadStats};
use crate::render::{HeatmapRenderer, RenderConfig};
use crate::types::{AggregationCell, HeatmapGrid};
use crate::{PRODUCER_NAME, VIZ_VERSION};

/// Convert CSV text to the aggregated heatmap grid for a selection.
///
/// # Arguments
/// * `csv` - Survey CSV with the required columns
/// * `selection` - Selected age options; empty or containing "All" means unfiltered
///
/// # Example
/// ```ignore
/// let grid = csv_to_heatmap(&csv, &[AgeOption::Group(AgeGroup::Age30To39)])?;
/// ```
pub fn csv_to_heatmap(csv: &str, selection: &[AgeOption]) -> Result<HeatmapGrid, VizError> {
    let processor = HeatmapProcessor::from_csv(csv)?;
    Ok(processor.grid_for(&selection_state(selection)))
}

/// Convert CSV text straight to a heatmap SVG document.
pub fn csv_to_heatmap_svg(
    csv: &str,
    selection: &[AgeOption],
    config: RenderConfig,
) -> Result<String, VizError> {
    let mut processor = HeatmapProcessor::with_config(DatasetLoader::load_csv(csv)?, config)?;
    if !selection.is_empty() {
        processor.apply(FilterEvent::SetSelection(selection.to_vec()));
    }
    Ok(processor.render_svg())
}

/// An empty selection from a caller means "nothing chosen yet", i.e. All
fn selection_state(selection: &[AgeOption]) -> FilterState {
    if selection.is_empty() {
        FilterState::default()
    } else {
        FilterState::from_selection(selection.iter().copied())
    }
}

/// Serialisable view of the current heatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSnapshot {
    pub producer: String,
    pub version: String,
    pub instance_id: String,
    pub generated_at_utc: String,
    pub selection: Vec<AgeOption>,
    pub age_options: Vec<AgeOption>,
    pub stats: LoadStats,
    pub cells: Vec<AggregationCell>,
}

/// Stateful heatmap holding the loaded dataset and current filter.
///
/// Construct once per successful load; every filter change re-aggregates the
/// full dataset from scratch.
pub struct HeatmapProcessor {
    dataset: Dataset,
    filter: FilterState,
    grid: HeatmapGrid,
    renderer: HeatmapRenderer,
}

impl HeatmapProcessor {
    /// Create a processor with the default render configuration
    pub fn new(dataset: Dataset) -> Self {
        let filter = FilterState::default();
        let grid = aggregate(&filter.filter_records(dataset.records()));
        Self {
            dataset,
            filter,
            grid,
            renderer: HeatmapRenderer::default(),
        }
    }

    /// Create a processor with a specific render configuration
    pub fn with_config(dataset: Dataset, config: RenderConfig) -> Result<Self, VizError> {
        let mut processor = Self::new(dataset);
        processor.renderer = HeatmapRenderer::new(config)?;
        Ok(processor)
    }

    pub fn from_source(source: &dyn DatasetSource) -> Result<Self, VizError> {
        Ok(Self::new(DatasetLoader::load(source)?))
    }

    pub fn from_csv(csv: &str) -> Result<Self, VizError> {
        Ok(Self::new(DatasetLoader::load_csv(csv)?))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn grid(&self) -> &HeatmapGrid {
        &self.grid
    }

    /// Grid for an arbitrary filter state, without changing the processor
    pub fn grid_for(&self, filter: &FilterState) -> HeatmapGrid {
        aggregate(&filter.filter_records(self.dataset.records()))
    }

    /// Apply a selector change and return the recomputed grid
    pub fn apply(&mut self, event: FilterEvent) -> &HeatmapGrid {
        self.filter = self.filter.apply(event);
        self.grid = self.grid_for(&self.filter);
        debug!(
            selection = ?self.filter.selected_ages(),
            records = self.grid.total(),
            "heatmap re-aggregated"
        );
        &self.grid
    }

    pub fn render_svg(&self) -> String {
        self.renderer.render(&self.grid)
    }

    pub fn snapshot(&self) -> HeatmapSnapshot {
        HeatmapSnapshot {
            producer: PRODUCER_NAME.to_string(),
            version: VIZ_VERSION.to_string(),
            instance_id: self.renderer.instance_id().to_string(),
            generated_at_utc: Utc::now().to_rfc3339(),
            selection: self.filter.selection().copied().collect(),
            age_options: self.dataset.age_options(),
            stats: self.dataset.stats(),
            cells: self.grid.cells().to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String, VizError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn to_json_pretty(&self) -> Result<String, VizError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}
