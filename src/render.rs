//! SVG heatmap renderer
//!
//! Binds the dense aggregation grid to a fixed visual grid: one rounded
//! rectangle per (sleep, caffeine) cell colored by trouble rate, a centered
//! count label, a hover tooltip, axis labels and a gradient legend.
//!
//! Rendering is a pure function of the grid and the configuration, so the
//! same grid always yields byte-identical output.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::ColorScale;
use crate::error::VizError;
use crate::types::{AggregationCell, CaffeineCategory, HeatmapGrid, SleepCategory};

const GRADIENT_ID: &str = "trouble-gradient";
const LEGEND_TITLE: &str = "Sleep trouble rate (%)";
const X_AXIS_TITLE: &str = "Caffeine level";
const Y_AXIS_TITLE: &str = "Sleep time";

/// Outer margins of the plot area (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 40.0,
            right: 40.0,
            bottom: 120.0,
            left: 110.0,
        }
    }
}

/// Layout configuration for the heatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    /// Band padding, as a fraction of the band step
    pub padding: f64,
    /// Corner radius of cell rectangles
    pub corner_radius: f64,
    pub legend_width: f64,
    pub legend_height: f64,
    /// Horizontal offset of the legend from the left edge
    pub legend_x: f64,
    pub font_family: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 720.0,
            height: 520.0,
            margin: Margin::default(),
            padding: 0.08,
            corner_radius: 18.0,
            legend_width: 300.0,
            legend_height: 14.0,
            legend_x: 200.0,
            font_family: "system-ui, sans-serif".to_string(),
        }
    }
}

impl RenderConfig {
    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, VizError> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, VizError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn inner_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    pub fn inner_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }

    pub fn validate(&self) -> Result<(), VizError> {
        if !(self.inner_width() > 0.0 && self.inner_height() > 0.0) {
            return Err(VizError::InvalidConfig(format!(
                "plot area {}x{} leaves no room inside the margins",
                self.width, self.height
            )));
        }
        if !(0.0..1.0).contains(&self.padding) {
            return Err(VizError::InvalidConfig(format!(
                "padding {} must be in [0, 1)",
                self.padding
            )));
        }
        if !(self.legend_width > 0.0 && self.legend_height > 0.0) {
            return Err(VizError::InvalidConfig(
                "legend dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Categorical band scale with equal inner and outer padding, centered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScale {
    start: f64,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    pub fn new(count: usize, range: (f64, f64), padding: f64) -> Self {
        let (r0, r1) = range;
        let n = count as f64;
        let step = (r1 - r0) / (n + padding).max(1.0);
        let start = r0 + (r1 - r0 - step * (n - padding)) * 0.5;
        Self {
            start,
            step,
            bandwidth: step * (1.0 - padding),
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Leading edge of band `index`
    pub fn position(&self, index: usize) -> f64 {
        self.start + self.step * index as f64
    }

    pub fn center(&self, index: usize) -> f64 {
        self.position(index) + self.bandwidth / 2.0
    }
}

/// Hover tooltip content for one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub sleep: String,
    pub caffeine: String,
    pub n: usize,
    /// Rate as a percentage with one decimal, e.g. "33.3%"
    pub rate: String,
}

impl Tooltip {
    pub fn for_cell(cell: &AggregationCell) -> Self {
        Self {
            sleep: cell.sleep.to_string(),
            caffeine: cell.caffeine.to_string(),
            n: cell.n,
            rate: format_percent(cell.rate),
        }
    }
}

impl fmt::Display for Tooltip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sleep: {}\nCaffeine: {}\nn={}\nTrouble rate={}",
            self.sleep, self.caffeine, self.n, self.rate
        )
    }
}

/// Format a [0, 1] rate as a one-decimal percentage, ties rounded up
pub fn format_percent(rate: f64) -> String {
    format!("{:.1}%", (rate * 1000.0).round() / 10.0)
}

/// Geometry and styling resolved for one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellShape {
    pub key: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    pub label: String,
    pub tooltip: Tooltip,
}

/// Heatmap renderer
pub struct HeatmapRenderer {
    config: RenderConfig,
    color: ColorScale,
    x: BandScale,
    y: BandScale,
    instance_id: String,
}

impl Default for HeatmapRenderer {
    fn default() -> Self {
        Self {
            x: Self::x_scale(&RenderConfig::default()),
            y: Self::y_scale(&RenderConfig::default()),
            config: RenderConfig::default(),
            color: ColorScale::default(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }
}

impl HeatmapRenderer {
    pub fn new(config: RenderConfig) -> Result<Self, VizError> {
        config.validate()?;
        Ok(Self {
            x: Self::x_scale(&config),
            y: Self::y_scale(&config),
            config,
            color: ColorScale::default(),
            instance_id: Uuid::new_v4().to_string(),
        })
    }

    fn x_scale(config: &RenderConfig) -> BandScale {
        BandScale::new(
            CaffeineCategory::GRID_ORDER.len(),
            (0.0, config.inner_width()),
            config.padding,
        )
    }

    fn y_scale(config: &RenderConfig) -> BandScale {
        BandScale::new(
            SleepCategory::GRID_ORDER.len(),
            (0.0, config.inner_height()),
            config.padding,
        )
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Identifier of this renderer, stamped into snapshots
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Resolve every cell to its shape, in grid order
    pub fn layout(&self, grid: &HeatmapGrid) -> Vec<CellShape> {
        grid.cells()
            .iter()
            .map(|cell| {
                let col = band_index(&CaffeineCategory::GRID_ORDER, &cell.caffeine);
                let row = band_index(&SleepCategory::GRID_ORDER, &cell.sleep);
                CellShape {
                    key: cell.key(),
                    x: self.x.position(col),
                    y: self.y.position(row),
                    width: self.x.bandwidth(),
                    height: self.y.bandwidth(),
                    fill: self.color.hex(cell.rate),
                    label: format!("n={}", cell.n),
                    tooltip: Tooltip::for_cell(cell),
                }
            })
            .collect()
    }

    /// Render the grid to a standalone SVG document
    pub fn render(&self, grid: &HeatmapGrid) -> String {
        let cfg = &self.config;
        let mut svg = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}" font-family="{}">"#,
            num(cfg.width),
            num(cfg.height),
            num(cfg.width),
            num(cfg.height),
            escape(&cfg.font_family)
        );
        svg.push_str(&self.render_defs());
        let _ = writeln!(
            svg,
            r#"  <g class="plot" transform="translate({},{})">"#,
            num(cfg.margin.left),
            num(cfg.margin.top)
        );
        svg.push_str(&self.render_axes());

        let shapes = self.layout(grid);
        for shape in &shapes {
            let _ = writeln!(
                svg,
                r#"    <rect class="cell" data-key="{}" x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}"><title>{}</title></rect>"#,
                shape.key,
                num(shape.x),
                num(shape.y),
                num(shape.width),
                num(shape.height),
                num(cfg.corner_radius),
                shape.fill,
                escape(&shape.tooltip.to_string())
            );
        }
        for shape in &shapes {
            let _ = writeln!(
                svg,
                r#"    <text class="label" data-key="{}" x="{}" y="{}" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
                shape.key,
                num(shape.x + shape.width / 2.0),
                num(shape.y + shape.height / 2.0),
                shape.label
            );
        }

        svg.push_str("  </g>\n");
        svg.push_str(&self.render_legend());
        svg.push_str("</svg>\n");
        svg
    }

    fn render_defs(&self) -> String {
        let mut defs = String::new();
        let _ = writeln!(
            defs,
            r#"  <defs>
    <linearGradient id="{GRADIENT_ID}" x1="0%" x2="100%" y1="0%" y2="0%">"#
        );
        for step in 0..=10 {
            let t = f64::from(step) / 10.0;
            let _ = writeln!(
                defs,
                r#"      <stop offset="{}%" stop-color="{}"/>"#,
                step * 10,
                self.color.hex(t)
            );
        }
        defs.push_str("    </linearGradient>\n  </defs>\n");
        defs
    }

    fn render_axes(&self) -> String {
        let inner_w = self.config.inner_width();
        let inner_h = self.config.inner_height();
        let mut axes = String::new();

        let _ = writeln!(axes, r#"    <g class="axis axis-x" transform="translate(0,{})">"#, num(inner_h));
        let _ = writeln!(
            axes,
            r#"      <line x1="0" x2="{}" y1="0" y2="0" stroke="currentColor"/>"#,
            num(inner_w)
        );
        for (i, caffeine) in CaffeineCategory::GRID_ORDER.iter().enumerate() {
            let _ = writeln!(
                axes,
                r#"      <text x="{}" y="18" text-anchor="middle" font-size="10">{}</text>"#,
                num(self.x.center(i)),
                caffeine
            );
        }
        axes.push_str("    </g>\n");

        let _ = writeln!(axes, r#"    <g class="axis axis-y">"#);
        let _ = writeln!(
            axes,
            r#"      <line x1="0" x2="0" y1="0" y2="{}" stroke="currentColor"/>"#,
            num(inner_h)
        );
        for (i, sleep) in SleepCategory::GRID_ORDER.iter().enumerate() {
            let _ = writeln!(
                axes,
                r#"      <text x="-9" y="{}" text-anchor="end" dominant-baseline="middle" font-size="10">{}</text>"#,
                num(self.y.center(i)),
                sleep
            );
        }
        axes.push_str("    </g>\n");

        let _ = writeln!(
            axes,
            r#"    <text class="axis-title" x="{}" y="{}" text-anchor="middle">{X_AXIS_TITLE}</text>"#,
            num(inner_w / 2.0),
            num(inner_h + 50.0)
        );
        let _ = writeln!(
            axes,
            r#"    <text class="axis-title" x="{}" y="-70" transform="rotate(-90)" text-anchor="middle">{Y_AXIS_TITLE}</text>"#,
            num(-inner_h / 2.0)
        );
        axes
    }

    fn render_legend(&self) -> String {
        let cfg = &self.config;
        let mut legend = String::new();
        let _ = writeln!(
            legend,
            r#"  <g class="legend" transform="translate({},{})">"#,
            num(cfg.legend_x),
            num(cfg.height - 22.0)
        );
        let _ = writeln!(
            legend,
            r#"    <text x="0" y="-8" font-size="12" font-weight="700">{}</text>"#,
            escape(LEGEND_TITLE)
        );
        let _ = writeln!(
            legend,
            r#"    <rect width="{}" height="{}" rx="10" fill="url(#{GRADIENT_ID})"/>"#,
            num(cfg.legend_width),
            num(cfg.legend_height)
        );
        for tick in 0..=5 {
            let t = f64::from(tick) / 5.0;
            let _ = writeln!(
                legend,
                r#"    <text x="{}" y="{}" text-anchor="middle" font-size="10">{}%</text>"#,
                num(t * cfg.legend_width),
                num(cfg.legend_height + 14.0),
                (t * 100.0).round()
            );
        }
        legend.push_str("  </g>\n");
        legend
    }
}

fn band_index<T: PartialEq>(order: &[T], value: &T) -> usize {
    order.iter().position(|v| v == value).unwrap_or_default()
}

/// Compact number formatting: at most two decimals, no trailing zeros
fn num(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::types::{AgeGroup, CategorizedRecord};
    use pretty_assertions::assert_eq;

    fn sample_grid() -> HeatmapGrid {
        let record = |sleep, caffeine, trouble| CategorizedRecord {
            age_group: AgeGroup::Age20To29,
            sleep,
            caffeine,
            trouble,
        };
        aggregate(&[
            record(SleepCategory::Short, CaffeineCategory::Low, 1),
            record(SleepCategory::Short, CaffeineCategory::Low, 0),
            record(SleepCategory::Short, CaffeineCategory::Low, 0),
            record(SleepCategory::Long, CaffeineCategory::High, 1),
        ])
    }

    #[test]
    fn test_band_scale_is_centered() {
        let scale = BandScale::new(4, (0.0, 570.0), 0.08);
        let leading = scale.position(0);
        let trailing = 570.0 - (scale.position(3) + scale.bandwidth());
        assert!((leading - trailing).abs() < 1e-9);
        assert!((scale.bandwidth() - scale.step() * 0.92).abs() < 1e-9);
        assert!((scale.step() - 570.0 / 4.08).abs() < 1e-9);
    }

    #[test]
    fn test_tooltip_format() {
        let grid = sample_grid();
        let cell = grid.cell(SleepCategory::Short, CaffeineCategory::Low);
        let tooltip = Tooltip::for_cell(cell);
        assert_eq!(tooltip.rate, "33.3%");
        assert_eq!(
            tooltip.to_string(),
            "Sleep: short\nCaffeine: low\nn=3\nTrouble rate=33.3%"
        );

        let empty = grid.cell(SleepCategory::Normal, CaffeineCategory::Zero);
        assert_eq!(Tooltip::for_cell(empty).rate, "0.0%");
    }

    #[test]
    fn test_percent_ties_round_up() {
        assert_eq!(format_percent(1.0 / 16.0), "6.3%");
        assert_eq!(format_percent(5.0 / 16.0), "31.3%");
        assert_eq!(format_percent(2.0 / 3.0), "66.7%");
        assert_eq!(format_percent(1.0), "100.0%");
        assert_eq!(format_percent(0.0), "0.0%");
    }

    #[test]
    fn test_layout_places_cells_by_band() {
        let renderer = HeatmapRenderer::default();
        let shapes = renderer.layout(&sample_grid());
        assert_eq!(shapes.len(), 12);

        // First row is "long", first column is "0"
        assert_eq!(shapes[0].key, "long0");
        assert!(shapes[0].x < shapes[1].x);
        assert!(shapes[0].y < shapes[4].y);
        assert_eq!(shapes[0].fill, "#ffffcc");

        let long_high = shapes.iter().find(|s| s.key == "longhigh").unwrap();
        assert_eq!(long_high.fill, "#800026");
        assert_eq!(long_high.label, "n=1");
    }

    #[test]
    fn test_render_contains_all_cells() {
        let svg = HeatmapRenderer::default().render(&sample_grid());
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches(r#"class="cell""#).count(), 12);
        assert_eq!(svg.matches(r#"class="label""#).count(), 12);
        assert!(svg.contains(">n=3</text>"));
        assert!(svg.contains("Trouble rate=33.3%"));
        assert!(svg.contains(X_AXIS_TITLE));
        assert!(svg.contains(Y_AXIS_TITLE));
        assert!(svg.contains(">100%</text>"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let renderer = HeatmapRenderer::default();
        let grid = sample_grid();
        assert_eq!(renderer.render(&grid), renderer.render(&grid));
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = RenderConfig::from_json(r#"{"width": 900}"#).unwrap();
        assert_eq!(config.width, 900.0);
        assert_eq!(config.height, 520.0);
        assert_eq!(config.padding, 0.08);

        let err = RenderConfig::from_json(r#"{"width": 100}"#).unwrap_err();
        assert!(matches!(err, VizError::InvalidConfig(_)));

        let err = RenderConfig::from_json(r#"{"padding": 1.5}"#).unwrap_err();
        assert!(matches!(err, VizError::InvalidConfig(_)));
        assert!(HeatmapRenderer::new(RenderConfig {
            height: 50.0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(11.176470588), "11.18");
        assert_eq!(num(40.0), "40");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(-0.001), "0");
    }
}
