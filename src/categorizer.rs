//! Record categorization
//!
//! Maps raw survey values onto the fixed bins used by the heatmap:
//! - Age: 20–29 (< 30), 30–39 (< 40), 40–50 (everything older)
//! - Sleep: short (< 7h), normal (7–9h inclusive), long (> 9h)
//! - Caffeine: 0 (<= 0mg), low (<= 100mg), mid (<= 200mg), high
//! - Trouble: 1 only for the "yes" code; "no" and missing both count as 0
//!
//! Non-finite input never bins, so rows with missing fields drop out of the
//! working dataset instead of failing the load.

use crate::types::{AgeGroup, CaffeineCategory, CategorizedRecord, RawRecord, SleepCategory};

/// Survey code for "yes, told a doctor about trouble sleeping"
pub const TROUBLE_YES: f64 = 1.0;

/// Categorizer for turning raw records into binned records
pub struct Categorizer;

impl Categorizer {
    /// Categorize a raw record, or `None` if any of the three bins is unresolved
    pub fn categorize(raw: &RawRecord) -> Option<CategorizedRecord> {
        Some(CategorizedRecord {
            age_group: age_bin(raw.age_years)?,
            sleep: sleep_bin(raw.sleep_hours)?,
            caffeine: caffeine_bin(raw.caffeine_mg)?,
            trouble: trouble_bin(raw.trouble_flag),
        })
    }
}

/// Bin an age in years
pub fn age_bin(age: f64) -> Option<AgeGroup> {
    if !age.is_finite() {
        return None;
    }
    Some(if age < 30.0 {
        AgeGroup::Age20To29
    } else if age < 40.0 {
        AgeGroup::Age30To39
    } else {
        AgeGroup::Age40To50
    })
}

/// Bin average nightly sleep hours
pub fn sleep_bin(hours: f64) -> Option<SleepCategory> {
    if !hours.is_finite() {
        return None;
    }
    Some(if hours < 7.0 {
        SleepCategory::Short
    } else if hours <= 9.0 {
        SleepCategory::Normal
    } else {
        SleepCategory::Long
    })
}

/// Bin daily caffeine intake in mg
pub fn caffeine_bin(mg: f64) -> Option<CaffeineCategory> {
    if !mg.is_finite() {
        return None;
    }
    Some(if mg <= 0.0 {
        CaffeineCategory::Zero
    } else if mg <= 100.0 {
        CaffeineCategory::Low
    } else if mg <= 200.0 {
        CaffeineCategory::Mid
    } else {
        CaffeineCategory::High
    })
}

/// Collapse the trouble-sleeping code to 0/1
pub fn trouble_bin(flag: f64) -> u8 {
    u8::from(flag == TROUBLE_YES)
}
