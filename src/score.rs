//! Sleep-score widget
//!
//! Five lifestyle factors, each an integer level in 0..=4, feed a fixed
//! additive risk table starting from 50. Sleep quality is `100 - risk`, and a
//! three-tier lookup turns quality into advice. Levels are immutable; each
//! interaction produces a new [`FactorLevels`] via [`FactorLevels::apply`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VizError;

/// Highest level a factor can take
pub const MAX_LEVEL: u8 = 4;

/// Baseline risk before any adjustment
pub const BASE_RISK: i32 = 50;

/// Quality at or above which sleep is rated great
pub const GREAT_THRESHOLD: u8 = 65;

/// Quality at or above which sleep is rated okay
pub const OKAY_THRESHOLD: u8 = 35;

/// Lifestyle factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Age,
    Weekend,
    Coffee,
    Activity,
    Bmi,
}

impl Factor {
    /// Display and stacking order
    pub const ALL: [Factor; 5] = [
        Factor::Age,
        Factor::Weekend,
        Factor::Coffee,
        Factor::Activity,
        Factor::Bmi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Age => "age",
            Factor::Weekend => "weekend",
            Factor::Coffee => "coffee",
            Factor::Activity => "activity",
            Factor::Bmi => "bmi",
        }
    }

    /// Fill color of this factor's potion and bottle layer
    pub fn color(&self) -> &'static str {
        match self {
            Factor::Age => "#7eb8da",
            Factor::Weekend => "#b8a0d4",
            Factor::Coffee => "#c4a574",
            Factor::Activity => "#7ec99e",
            Factor::Bmi => "#e8b88a",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Factor {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Factor::ALL
            .into_iter()
            .find(|factor| factor.as_str() == lower)
            .ok_or_else(|| VizError::UnknownFactor(s.to_string()))
    }
}

/// Widget interactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    /// Click or Enter/Space on a potion: advance its level, wrapping 4 -> 0
    Cycle(Factor),
    /// Back to the initial levels
    Reset,
}

#[derive(Deserialize)]
struct LevelsRepr {
    age: u8,
    weekend: u8,
    coffee: u8,
    activity: u8,
    bmi: u8,
}

/// Current level of every factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LevelsRepr")]
pub struct FactorLevels {
    age: u8,
    weekend: u8,
    coffee: u8,
    activity: u8,
    bmi: u8,
}

impl TryFrom<LevelsRepr> for FactorLevels {
    type Error = VizError;

    fn try_from(repr: LevelsRepr) -> Result<Self, Self::Error> {
        FactorLevels::new(repr.age, repr.weekend, repr.coffee, repr.activity, repr.bmi)
    }
}

impl Default for FactorLevels {
    fn default() -> Self {
        Self {
            age: 1,
            weekend: 0,
            coffee: 1,
            activity: 2,
            bmi: 0,
        }
    }
}

impl FactorLevels {
    pub fn new(age: u8, weekend: u8, coffee: u8, activity: u8, bmi: u8) -> Result<Self, VizError> {
        let levels = Self {
            age,
            weekend,
            coffee,
            activity,
            bmi,
        };
        for factor in Factor::ALL {
            let level = levels.get(factor);
            if level > MAX_LEVEL {
                return Err(VizError::InvalidLevel {
                    factor: factor.to_string(),
                    level,
                    max: MAX_LEVEL,
                });
            }
        }
        Ok(levels)
    }

    pub fn get(&self, factor: Factor) -> u8 {
        match factor {
            Factor::Age => self.age,
            Factor::Weekend => self.weekend,
            Factor::Coffee => self.coffee,
            Factor::Activity => self.activity,
            Factor::Bmi => self.bmi,
        }
    }

    fn with(mut self, factor: Factor, level: u8) -> Self {
        let slot = match factor {
            Factor::Age => &mut self.age,
            Factor::Weekend => &mut self.weekend,
            Factor::Coffee => &mut self.coffee,
            Factor::Activity => &mut self.activity,
            Factor::Bmi => &mut self.bmi,
        };
        *slot = level;
        self
    }

    /// Produce the levels that follow `event`
    pub fn apply(&self, event: ScoreEvent) -> FactorLevels {
        match event {
            ScoreEvent::Cycle(factor) => {
                let next = (self.get(factor) + 1) % (MAX_LEVEL + 1);
                self.with(factor, next)
            }
            ScoreEvent::Reset => FactorLevels::default(),
        }
    }

    /// Risk score in [0, 100]
    pub fn risk(&self) -> u8 {
        let mut risk = BASE_RISK;

        if self.age <= 1 {
            risk -= 8;
        } else if self.age >= 3 {
            risk += 10;
        }

        if self.weekend >= 1 {
            risk += 15;
        }

        risk += match self.coffee {
            0 => -5,
            1 | 2 => 5,
            _ => 15,
        };

        if self.activity <= 1 {
            risk += 12;
        } else if self.activity >= 3 {
            risk -= 10;
        }

        risk += match self.bmi {
            0 => -8,
            1 | 2 => 5,
            _ => 12,
        };

        risk.clamp(0, 100) as u8
    }

    /// Sleep quality percentage, `100 - risk`
    pub fn quality(&self) -> u8 {
        100 - self.risk()
    }

    /// Potion fill height as a percentage of the bottle
    pub fn fill_percent(&self, factor: Factor) -> f64 {
        f64::from(self.get(factor)) / f64::from(MAX_LEVEL) * 100.0
    }

    /// Stacked bottle layers, bottom first; zero-level factors are skipped
    pub fn bottle_layers(&self) -> Vec<BottleLayer> {
        let total = match Factor::ALL.iter().map(|f| u32::from(self.get(*f))).sum::<u32>() {
            0 => 1,
            sum => sum,
        };

        let mut bottom = 0.0;
        let mut layers = Vec::new();
        for factor in Factor::ALL {
            let level = self.get(factor);
            if level == 0 {
                continue;
            }
            let height = f64::from(level) / f64::from(total) * 100.0;
            layers.push(BottleLayer {
                factor,
                color: factor.color().to_string(),
                height_percent: height,
                bottom_percent: bottom,
            });
            bottom += height;
        }
        layers
    }

    /// Full result of a "pour"
    pub fn report(&self) -> ScoreReport {
        let risk = self.risk();
        let quality = 100 - risk;
        ScoreReport {
            levels: *self,
            risk,
            quality,
            advice: Advice::for_quality(quality),
            layers: self.bottle_layers(),
            star_size_px: star_size_px(quality),
        }
    }
}

/// One colored band of the bottle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleLayer {
    pub factor: Factor,
    pub color: String,
    pub height_percent: f64,
    pub bottom_percent: f64,
}

/// Advice tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceTier {
    Great,
    Okay,
    Improve,
}

/// Two-part advice shown after a pour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub tier: AdviceTier,
    pub main: String,
    pub tip: String,
}

impl Advice {
    pub fn for_quality(quality: u8) -> Self {
        let (tier, main, tip) = if quality >= GREAT_THRESHOLD {
            (
                AdviceTier::Great,
                "Your sleep quality is great! Your mix of habits supports good rest.",
                "Keep a consistent 7–9 hours to maintain it.",
            )
        } else if quality >= OKAY_THRESHOLD {
            (
                AdviceTier::Okay,
                "Your sleep quality is okay. A few changes could help.",
                "Try less caffeine after 2 p.m. and similar wake times on weekends.",
            )
        } else {
            (
                AdviceTier::Improve,
                "Your sleep quality can improve. Schedule, caffeine, activity, or BMI might be affecting it.",
                "Pick one change: fewer coffees, more movement, or a fixed wake time.",
            )
        };
        Self {
            tier,
            main: main.to_string(),
            tip: tip.to_string(),
        }
    }
}

/// Star glyph size for a quality percentage (24px at 0, 104px at 100)
pub fn star_size_px(quality: u8) -> f64 {
    24.0 + f64::from(quality) / 100.0 * 80.0
}

/// Everything the widget displays after a pour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub levels: FactorLevels,
    pub risk: u8,
    pub quality: u8,
    pub advice: Advice,
    pub layers: Vec<BottleLayer>,
    pub star_size_px: f64,
}

/// Explicit factor -> UI handle mapping, resolved once at setup
#[derive(Debug, Clone)]
pub struct FactorBindings<H> {
    handles: HashMap<Factor, H>,
}

impl<H> FactorBindings<H> {
    /// Bind handles; every factor must appear exactly once
    pub fn new(bindings: impl IntoIterator<Item = (Factor, H)>) -> Result<Self, VizError> {
        let mut handles = HashMap::new();
        for (factor, handle) in bindings {
            if handles.insert(factor, handle).is_some() {
                return Err(VizError::BindingError(format!("{factor} bound twice")));
            }
        }
        if let Some(missing) = Factor::ALL.iter().find(|f| !handles.contains_key(f)) {
            return Err(VizError::BindingError(format!("{missing} has no handle")));
        }
        Ok(Self { handles })
    }

    /// Resolve a handle for each factor with `lookup`, failing on the first miss
    pub fn resolve(mut lookup: impl FnMut(Factor) -> Option<H>) -> Result<Self, VizError> {
        let mut bindings = Vec::with_capacity(Factor::ALL.len());
        for factor in Factor::ALL {
            let handle = lookup(factor)
                .ok_or_else(|| VizError::BindingError(format!("{factor} has no handle")))?;
            bindings.push((factor, handle));
        }
        Self::new(bindings)
    }

    pub fn get(&self, factor: Factor) -> &H {
        // Construction guarantees every factor is present
        &self.handles[&factor]
    }

    /// Handles in factor order
    pub fn iter(&self) -> impl Iterator<Item = (Factor, &H)> {
        Factor::ALL.into_iter().map(move |f| (f, &self.handles[&f]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_levels_score() {
        let levels = FactorLevels::default();
        // 50 - 8 + 0 + 5 + 0 - 8
        assert_eq!(levels.risk(), 39);
        assert_eq!(levels.quality(), 61);
        assert_eq!(Advice::for_quality(levels.quality()).tier, AdviceTier::Okay);
    }

    #[test]
    fn test_risk_table() {
        let worst = FactorLevels::new(4, 4, 4, 0, 4).unwrap();
        // 50 + 10 + 15 + 15 + 12 + 12 = 114, clamped
        assert_eq!(worst.risk(), 100);
        assert_eq!(worst.quality(), 0);

        let best = FactorLevels::new(0, 0, 0, 4, 0).unwrap();
        // 50 - 8 - 5 - 10 - 8
        assert_eq!(best.risk(), 19);
        assert_eq!(best.quality(), 81);

        let middling = FactorLevels::new(2, 1, 3, 2, 2).unwrap();
        // 50 + 0 + 15 + 15 + 0 + 5
        assert_eq!(middling.risk(), 85);
    }

    #[test]
    fn test_advice_boundaries() {
        assert_eq!(Advice::for_quality(65).tier, AdviceTier::Great);
        assert_eq!(Advice::for_quality(64).tier, AdviceTier::Okay);
        assert_eq!(Advice::for_quality(35).tier, AdviceTier::Okay);
        assert_eq!(Advice::for_quality(34).tier, AdviceTier::Improve);
        assert!(Advice::for_quality(90).tip.contains("7–9 hours"));
    }

    #[test]
    fn test_cycle_wraps() {
        let mut levels = FactorLevels::default();
        let seen: Vec<u8> = (0..6)
            .map(|_| {
                levels = levels.apply(ScoreEvent::Cycle(Factor::Coffee));
                levels.get(Factor::Coffee)
            })
            .collect();
        assert_eq!(seen, vec![2, 3, 4, 0, 1, 2]);
        assert_eq!(levels.get(Factor::Age), 1);
        assert_eq!(levels.apply(ScoreEvent::Reset), FactorLevels::default());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let err = FactorLevels::new(1, 5, 0, 0, 0).unwrap_err();
        assert!(matches!(err, VizError::InvalidLevel { level: 5, .. }));

        let parsed: Result<FactorLevels, _> =
            serde_json::from_str(r#"{"age":1,"weekend":0,"coffee":9,"activity":2,"bmi":0}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_bottle_layers() {
        let levels = FactorLevels::default();
        let layers = levels.bottle_layers();
        // age 1, coffee 1, activity 2 out of 4
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].factor, Factor::Age);
        assert_eq!(layers[0].height_percent, 25.0);
        assert_eq!(layers[1].bottom_percent, 25.0);
        assert_eq!(layers[2].factor, Factor::Activity);
        assert_eq!(layers[2].height_percent, 50.0);
        assert_eq!(layers[2].bottom_percent, 50.0);

        let empty = FactorLevels::new(0, 0, 0, 0, 0).unwrap();
        assert!(empty.bottle_layers().is_empty());
    }

    #[test]
    fn test_report() {
        let report = FactorLevels::default().report();
        assert_eq!(report.quality, 61);
        assert!((report.star_size_px - 72.8).abs() < 1e-9);
        assert_eq!(FactorLevels::default().fill_percent(Factor::Activity), 50.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["advice"]["tier"], "okay");
        assert_eq!(json["levels"]["activity"], 2);
    }

    #[test]
    fn test_factor_parse() {
        assert_eq!("BMI".parse::<Factor>().unwrap(), Factor::Bmi);
        assert!(matches!(
            "stress".parse::<Factor>(),
            Err(VizError::UnknownFactor(_))
        ));
    }

    #[test]
    fn test_bindings_validation() {
        let bindings = FactorBindings::resolve(|f| Some(format!("potion-{f}"))).unwrap();
        assert_eq!(bindings.get(Factor::Bmi), "potion-bmi");
        assert_eq!(bindings.iter().count(), 5);

        let err = FactorBindings::resolve(|f| (f != Factor::Weekend).then_some(1)).unwrap_err();
        assert!(matches!(err, VizError::BindingError(ref m) if m.contains("weekend")));

        let duplicate = Factor::ALL
            .into_iter()
            .map(|f| (f, 0))
            .chain(std::iter::once((Factor::Age, 1)));
        assert!(FactorBindings::new(duplicate).is_err());
    }
}
