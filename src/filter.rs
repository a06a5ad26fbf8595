//! Age filter control
//!
//! The selector offers "All" plus each age group present in the data. Any
//! number of options may be selected at once; "All" anywhere in the selection
//! means no filtering. State is immutable and moves forward through
//! [`FilterState::apply`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VizError;
use crate::types::{AgeGroup, CategorizedRecord};

pub const ALL_LABEL: &str = "All";

/// One option of the age selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeOption {
    All,
    Group(AgeGroup),
}

impl AgeOption {
    pub fn label(&self) -> &'static str {
        match self {
            AgeOption::All => ALL_LABEL,
            AgeOption::Group(group) => group.as_str(),
        }
    }
}

impl fmt::Display for AgeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeOption {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_LABEL) {
            return Ok(AgeOption::All);
        }
        AgeGroup::from_label(s)
            .map(AgeOption::Group)
            .ok_or_else(|| VizError::UnknownAgeOption(s.to_string()))
    }
}

// Options travel as their selector labels ("All", "20–29", ...)
impl Serialize for AgeOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for AgeOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(D::Error::custom)
    }
}

/// Change events emitted by the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    /// Replace the selection with exactly these options
    SetSelection(Vec<AgeOption>),
    /// Flip one option in or out of the selection
    Toggle(AgeOption),
    /// Back to the default ("All" selected)
    Reset,
}

/// Current selector state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    selected: BTreeSet<AgeOption>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected: BTreeSet::from([AgeOption::All]),
        }
    }
}

impl FilterState {
    pub fn from_selection(options: impl IntoIterator<Item = AgeOption>) -> Self {
        Self {
            selected: options.into_iter().collect(),
        }
    }

    /// Produce the state that follows `event`
    pub fn apply(&self, event: FilterEvent) -> FilterState {
        match event {
            FilterEvent::SetSelection(options) => FilterState::from_selection(options),
            FilterEvent::Toggle(option) => {
                let mut selected = self.selected.clone();
                if !selected.remove(&option) {
                    selected.insert(option);
                }
                FilterState { selected }
            }
            FilterEvent::Reset => FilterState::default(),
        }
    }

    pub fn selection(&self) -> impl Iterator<Item = &AgeOption> {
        self.selected.iter()
    }

    /// Effective age filter; `None` means no filtering.
    ///
    /// An empty selection filters everything out.
    pub fn selected_ages(&self) -> Option<BTreeSet<AgeGroup>> {
        if self.selected.contains(&AgeOption::All) {
            return None;
        }
        Some(
            self.selected
                .iter()
                .filter_map(|option| match option {
                    AgeOption::Group(group) => Some(*group),
                    AgeOption::All => None,
                })
                .collect(),
        )
    }

    /// Records that pass the current selection
    pub fn filter_records(&self, records: &[CategorizedRecord]) -> Vec<CategorizedRecord> {
        match self.selected_ages() {
            None => records.to_vec(),
            Some(ages) => records
                .iter()
                .filter(|r| ages.contains(&r.age_group))
                .copied()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaffeineCategory, SleepCategory};
    use pretty_assertions::assert_eq;

    fn records() -> Vec<CategorizedRecord> {
        AgeGroup::ALL
            .into_iter()
            .map(|age_group| CategorizedRecord {
                age_group,
                sleep: SleepCategory::Normal,
                caffeine: CaffeineCategory::Zero,
                trouble: 0,
            })
            .collect()
    }

    #[test]
    fn test_default_is_unfiltered() {
        let state = FilterState::default();
        assert_eq!(state.selected_ages(), None);
        assert_eq!(state.filter_records(&records()).len(), 3);
    }

    #[test]
    fn test_all_takes_precedence() {
        let state = FilterState::from_selection([
            AgeOption::Group(AgeGroup::Age20To29),
            AgeOption::All,
        ]);
        assert_eq!(state.selected_ages(), None);
        assert_eq!(state.filter_records(&records()), records());
    }

    #[test]
    fn test_multi_select() {
        let state = FilterState::default().apply(FilterEvent::SetSelection(vec![
            AgeOption::Group(AgeGroup::Age20To29),
            AgeOption::Group(AgeGroup::Age40To50),
        ]));
        assert_eq!(
            state.selected_ages(),
            Some(BTreeSet::from([AgeGroup::Age20To29, AgeGroup::Age40To50]))
        );
        let filtered = state.filter_records(&records());
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.age_group != AgeGroup::Age30To39));
    }

    #[test]
    fn test_empty_selection_filters_everything() {
        let state = FilterState::default().apply(FilterEvent::Toggle(AgeOption::All));
        assert_eq!(state.selected_ages(), Some(BTreeSet::new()));
        assert!(state.filter_records(&records()).is_empty());
    }

    #[test]
    fn test_transitions_do_not_mutate_previous_state() {
        let initial = FilterState::default();
        let toggled = initial.apply(FilterEvent::Toggle(AgeOption::Group(AgeGroup::Age30To39)));

        assert_eq!(initial, FilterState::default());
        assert_eq!(toggled.selected_ages(), None);

        let narrowed = toggled.apply(FilterEvent::Toggle(AgeOption::All));
        assert_eq!(
            narrowed.selected_ages(),
            Some(BTreeSet::from([AgeGroup::Age30To39]))
        );
        assert_eq!(narrowed.apply(FilterEvent::Reset), FilterState::default());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("All".parse::<AgeOption>().unwrap(), AgeOption::All);
        assert_eq!("all".parse::<AgeOption>().unwrap(), AgeOption::All);
        assert_eq!(
            "20-29".parse::<AgeOption>().unwrap(),
            AgeOption::Group(AgeGroup::Age20To29)
        );
        assert!(matches!(
            "teens".parse::<AgeOption>(),
            Err(VizError::UnknownAgeOption(_))
        ));
    }

    #[test]
    fn test_option_serde_labels() {
        let options = vec![AgeOption::All, AgeOption::Group(AgeGroup::Age30To39)];
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"["All","30–39"]"#);
        let parsed: Vec<AgeOption> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);
    }
}
