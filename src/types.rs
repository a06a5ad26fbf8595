//! Core types for the sleepviz pipeline
//!
//! This module defines the data structures that flow through each stage:
//! raw survey records, categorized records, and the dense aggregation grid.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VizError;

/// Age band of a survey respondent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "20–29")]
    Age20To29,
    #[serde(rename = "30–39")]
    Age30To39,
    #[serde(rename = "40–50")]
    Age40To50,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Age20To29, AgeGroup::Age30To39, AgeGroup::Age40To50];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Age20To29 => "20–29",
            AgeGroup::Age30To39 => "30–39",
            AgeGroup::Age40To50 => "40–50",
        }
    }

    /// Parse a display label. Accepts a plain hyphen in place of the en dash.
    pub fn from_label(label: &str) -> Option<AgeGroup> {
        let normalized = label.trim().replace('-', "–");
        AgeGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == normalized)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Average nightly sleep duration band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepCategory {
    Short,
    Normal,
    Long,
}

impl SleepCategory {
    /// Row order of the heatmap, top to bottom
    pub const GRID_ORDER: [SleepCategory; 3] =
        [SleepCategory::Long, SleepCategory::Normal, SleepCategory::Short];

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepCategory::Short => "short",
            SleepCategory::Normal => "normal",
            SleepCategory::Long => "long",
        }
    }
}

impl fmt::Display for SleepCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily caffeine intake band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CaffeineCategory {
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "mid")]
    Mid,
    #[serde(rename = "high")]
    High,
}

impl CaffeineCategory {
    /// Column order of the heatmap, left to right
    pub const GRID_ORDER: [CaffeineCategory; 4] = [
        CaffeineCategory::Zero,
        CaffeineCategory::Low,
        CaffeineCategory::Mid,
        CaffeineCategory::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaffeineCategory::Zero => "0",
            CaffeineCategory::Low => "low",
            CaffeineCategory::Mid => "mid",
            CaffeineCategory::High => "high",
        }
    }
}

impl fmt::Display for CaffeineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dataset row as ingested. Missing or unparseable fields are `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Age in years
    pub age_years: f64,
    /// Average weekly sleep (hours per night)
    pub sleep_hours: f64,
    /// Caffeine intake on day 1 (mg)
    pub caffeine_mg: f64,
    /// "Told doctor about trouble sleeping" (1 = yes, 2 = no)
    pub trouble_flag: f64,
}

impl Default for RawRecord {
    fn default() -> Self {
        Self {
            age_years: f64::NAN,
            sleep_hours: f64::NAN,
            caffeine_mg: f64::NAN,
            trouble_flag: f64::NAN,
        }
    }
}

/// A record whose three bins all resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategorizedRecord {
    pub age_group: AgeGroup,
    pub sleep: SleepCategory,
    pub caffeine: CaffeineCategory,
    /// 1 if trouble sleeping was reported, else 0
    pub trouble: u8,
}

/// One (sleep, caffeine) cell of the heatmap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationCell {
    pub sleep: SleepCategory,
    pub caffeine: CaffeineCategory,
    /// Number of matching records
    pub n: usize,
    /// Mean trouble rate in [0, 1]; 0 for empty cells
    pub rate: f64,
}

impl AggregationCell {
    /// Stable key used to bind a cell to its visual element
    pub fn key(&self) -> String {
        format!("{}{}", self.sleep.as_str(), self.caffeine.as_str())
    }
}

/// Dense 3x4 aggregation result in fixed grid order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AggregationCell>", into = "Vec<AggregationCell>")]
pub struct HeatmapGrid {
    cells: Vec<AggregationCell>,
}

impl TryFrom<Vec<AggregationCell>> for HeatmapGrid {
    type Error = VizError;

    fn try_from(cells: Vec<AggregationCell>) -> Result<Self, Self::Error> {
        if cells.len() != Self::CELL_COUNT {
            return Err(VizError::ParseError(format!(
                "heatmap grid has {} cells, expected {}",
                cells.len(),
                Self::CELL_COUNT
            )));
        }
        let expected = SleepCategory::GRID_ORDER.iter().flat_map(|sleep| {
            CaffeineCategory::GRID_ORDER
                .iter()
                .map(move |caffeine| (*sleep, *caffeine))
        });
        for (cell, (sleep, caffeine)) in cells.iter().zip(expected) {
            if cell.sleep != sleep || cell.caffeine != caffeine {
                return Err(VizError::ParseError(format!(
                    "heatmap cell {} out of order, expected {}{}",
                    cell.key(),
                    sleep,
                    caffeine
                )));
            }
        }
        Ok(Self { cells })
    }
}

impl From<HeatmapGrid> for Vec<AggregationCell> {
    fn from(grid: HeatmapGrid) -> Self {
        grid.cells
    }
}

impl HeatmapGrid {
    pub const CELL_COUNT: usize = 12;

    pub(crate) fn from_cells(cells: Vec<AggregationCell>) -> Self {
        debug_assert_eq!(cells.len(), Self::CELL_COUNT);
        Self { cells }
    }

    pub fn cells(&self) -> &[AggregationCell] {
        &self.cells
    }

    pub fn cell(&self, sleep: SleepCategory, caffeine: CaffeineCategory) -> &AggregationCell {
        let row = SleepCategory::GRID_ORDER
            .iter()
            .position(|s| *s == sleep)
            .unwrap_or_default();
        let col = CaffeineCategory::GRID_ORDER
            .iter()
            .position(|c| *c == caffeine)
            .unwrap_or_default();
        &self.cells[row * CaffeineCategory::GRID_ORDER.len() + col]
    }

    /// Sum of `n` across all cells
    pub fn total(&self) -> usize {
        self.cells.iter().map(|c| c.n).sum()
    }
}
