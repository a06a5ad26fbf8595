//! Heatmap aggregation
//!
//! Groups categorized records by (sleep, caffeine) and produces a dense grid
//! of all 12 combinations, so every cell can be bound by a fixed key.

use std::collections::HashMap;

use crate::types::{
    AggregationCell, CaffeineCategory, CategorizedRecord, HeatmapGrid, SleepCategory,
};

/// Aggregate records into the dense 3x4 heatmap grid.
///
/// Cells come out sleep-major (long, normal, short) with caffeine
/// (0, low, mid, high) inside. Empty cells carry `n = 0, rate = 0`.
pub fn aggregate(records: &[CategorizedRecord]) -> HeatmapGrid {
    // (count, trouble count) per key
    let mut groups: HashMap<(SleepCategory, CaffeineCategory), (usize, usize)> = HashMap::new();
    for record in records {
        let entry = groups.entry((record.sleep, record.caffeine)).or_default();
        entry.0 += 1;
        entry.1 += usize::from(record.trouble);
    }

    let mut cells = Vec::with_capacity(HeatmapGrid::CELL_COUNT);
    for sleep in SleepCategory::GRID_ORDER {
        for caffeine in CaffeineCategory::GRID_ORDER {
            let (n, troubled) = groups.get(&(sleep, caffeine)).copied().unwrap_or((0, 0));
            let rate = if n == 0 {
                0.0
            } else {
                troubled as f64 / n as f64
            };
            cells.push(AggregationCell {
                sleep,
                caffeine,
                n,
                rate,
            });
        }
    }

    HeatmapGrid::from_cells(cells)
}
