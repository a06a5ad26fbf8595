//! Dataset loading
//!
//! Reads survey rows from a source, runs each through the [`Categorizer`] and
//! keeps only rows whose age, sleep and caffeine bins all resolved.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::categorizer::Categorizer;
use crate::error::VizError;
use crate::filter::AgeOption;
use crate::types::{AgeGroup, CategorizedRecord, RawRecord};

pub const COL_AGE: &str = "age_years";
pub const COL_SLEEP: &str = "sleep_hours_weekly_avg";
pub const COL_CAFFEINE: &str = "caffeine_mg_day1";
pub const COL_TROUBLE: &str = "told_doctor_trouble_sleeping";

/// Columns every dataset must carry
pub const REQUIRED_COLUMNS: [&str; 4] = [COL_AGE, COL_SLEEP, COL_CAFFEINE, COL_TROUBLE];

/// Trait for anything that can produce raw survey rows
pub trait DatasetSource {
    /// Read all rows. Field-level parse failures become `NaN`; only an
    /// unreachable or structurally malformed source is an error.
    fn rows(&self) -> Result<Vec<RawRecord>, VizError>;
}

/// CSV dataset held in memory or on disk
pub enum CsvSource {
    Text(String),
    File(PathBuf),
}

impl CsvSource {
    pub fn from_text(text: impl Into<String>) -> Self {
        CsvSource::Text(text.into())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        CsvSource::File(path.as_ref().to_path_buf())
    }

    fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRecord>, VizError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| VizError::MissingColumn(name.to_string()))
        };
        let age_idx = column(COL_AGE)?;
        let sleep_idx = column(COL_SLEEP)?;
        let caffeine_idx = column(COL_CAFFEINE)?;
        let trouble_idx = column(COL_TROUBLE)?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let field = |idx: usize| parse_number(record.get(idx));
            rows.push(RawRecord {
                age_years: field(age_idx),
                sleep_hours: field(sleep_idx),
                caffeine_mg: field(caffeine_idx),
                trouble_flag: field(trouble_idx),
            });
        }
        Ok(rows)
    }
}

impl DatasetSource for CsvSource {
    fn rows(&self) -> Result<Vec<RawRecord>, VizError> {
        match self {
            CsvSource::Text(text) => Self::read_rows(text.as_bytes()),
            CsvSource::File(path) => {
                let file = std::fs::File::open(path)?;
                Self::read_rows(file)
            }
        }
    }
}

/// Rows already split into field-name → raw-value maps
pub struct RowMapSource {
    rows: Vec<HashMap<String, String>>,
}

impl RowMapSource {
    pub fn new(rows: Vec<HashMap<String, String>>) -> Self {
        Self { rows }
    }
}

impl DatasetSource for RowMapSource {
    fn rows(&self) -> Result<Vec<RawRecord>, VizError> {
        Ok(self
            .rows
            .iter()
            .map(|row| {
                let field = |name: &str| parse_number(row.get(name).map(String::as_str));
                RawRecord {
                    age_years: field(COL_AGE),
                    sleep_hours: field(COL_SLEEP),
                    caffeine_mg: field(COL_CAFFEINE),
                    trouble_flag: field(COL_TROUBLE),
                }
            })
            .collect())
    }
}

/// Parse a raw field; empty, missing or non-numeric values become `NaN`
fn parse_number(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Row counts from a load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub total_rows: usize,
    pub retained_rows: usize,
    pub dropped_rows: usize,
}

/// The retained, categorized working dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<CategorizedRecord>,
    age_groups: Vec<AgeGroup>,
    stats: LoadStats,
}

impl Dataset {
    /// Build a dataset from already-categorized records
    pub fn from_records(records: Vec<CategorizedRecord>) -> Self {
        let mut age_groups: Vec<AgeGroup> = Vec::new();
        for record in &records {
            if !age_groups.contains(&record.age_group) {
                age_groups.push(record.age_group);
            }
        }
        let stats = LoadStats {
            total_rows: records.len(),
            retained_rows: records.len(),
            dropped_rows: 0,
        };
        Self {
            records,
            age_groups,
            stats,
        }
    }

    pub fn records(&self) -> &[CategorizedRecord] {
        &self.records
    }

    /// Distinct age groups present, in order of first appearance
    pub fn age_groups(&self) -> &[AgeGroup] {
        &self.age_groups
    }

    /// Selector options: "All" followed by each distinct age group
    pub fn age_options(&self) -> Vec<AgeOption> {
        std::iter::once(AgeOption::All)
            .chain(self.age_groups.iter().copied().map(AgeOption::Group))
            .collect()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Loader that applies categorization and the retention rule
pub struct DatasetLoader;

impl DatasetLoader {
    pub fn load(source: &dyn DatasetSource) -> Result<Dataset, VizError> {
        let rows = source.rows()?;
        let total_rows = rows.len();

        let mut records = Vec::with_capacity(total_rows);
        for (index, raw) in rows.iter().enumerate() {
            match Categorizer::categorize(raw) {
                Some(record) => records.push(record),
                None => debug!(row = index + 1, "row excluded: unresolved bin"),
            }
        }

        let mut dataset = Dataset::from_records(records);
        dataset.stats = LoadStats {
            total_rows,
            retained_rows: dataset.records.len(),
            dropped_rows: total_rows - dataset.records.len(),
        };

        info!(
            total = dataset.stats.total_rows,
            retained = dataset.stats.retained_rows,
            dropped = dataset.stats.dropped_rows,
            "dataset loaded"
        );

        Ok(dataset)
    }

    pub fn load_csv(text: &str) -> Result<Dataset, VizError> {
        Self::load(&CsvSource::from_text(text))
    }

    pub fn load_path(path: impl AsRef<Path>) -> Result<Dataset, VizError> {
        Self::load(&CsvSource::from_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaffeineCategory, SleepCategory};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn sample_csv() -> &'static str {
        "seqn,age_years,sleep_hours_weekly_avg,caffeine_mg_day1,told_doctor_trouble_sleeping\n\
         1,34,6.5,80,1\n\
         2,22,8,0,2\n\
         3,45,,120,1\n\
         4,38,10,250,9\n\
         5,27,7,abc,2\n\
         6,61,9,100,1\n"
    }

    #[test]
    fn test_load_csv_drops_unbinnable_rows() {
        let dataset = DatasetLoader::load_csv(sample_csv()).unwrap();

        assert_eq!(
            dataset.stats(),
            LoadStats {
                total_rows: 6,
                retained_rows: 4,
                dropped_rows: 2,
            }
        );

        let first = dataset.records()[0];
        assert_eq!(first.age_group, AgeGroup::Age30To39);
        assert_eq!(first.sleep, SleepCategory::Short);
        assert_eq!(first.caffeine, CaffeineCategory::Low);
        assert_eq!(first.trouble, 1);

        // Unknown trouble code (9) counts as no trouble
        assert_eq!(dataset.records()[2].trouble, 0);
    }

    #[test]
    fn test_age_options_first_appearance() {
        let dataset = DatasetLoader::load_csv(sample_csv()).unwrap();
        assert_eq!(
            dataset.age_options(),
            vec![
                AgeOption::All,
                AgeOption::Group(AgeGroup::Age30To39),
                AgeOption::Group(AgeGroup::Age20To29),
                AgeOption::Group(AgeGroup::Age40To50),
            ]
        );
    }

    #[test]
    fn test_missing_column_is_load_error() {
        let csv = "age_years,sleep_hours_weekly_avg,caffeine_mg_day1\n30,8,50\n";
        let err = DatasetLoader::load_csv(csv).unwrap_err();
        assert!(err.is_load_error());
        assert!(matches!(err, VizError::MissingColumn(ref c) if c == COL_TROUBLE));
    }

    #[test]
    fn test_ragged_csv_is_load_error() {
        let csv = "age_years,sleep_hours_weekly_avg,caffeine_mg_day1,told_doctor_trouble_sleeping\n\
                   30,8,50,1\n\
                   31,8\n";
        let err = DatasetLoader::load_csv(csv).unwrap_err();
        assert!(matches!(err, VizError::Csv(_)));
    }

    #[test]
    fn test_unreachable_file_is_load_error() {
        let err = DatasetLoader::load_path("/nonexistent/sleepviz/data.csv").unwrap_err();
        assert!(matches!(err, VizError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_csv().as_bytes()).unwrap();

        let dataset = DatasetLoader::load_path(file.path()).unwrap();
        assert_eq!(dataset.records().len(), 4);
    }

    #[test]
    fn test_row_map_source() {
        let mut row = HashMap::new();
        row.insert(COL_AGE.to_string(), "29".to_string());
        row.insert(COL_SLEEP.to_string(), "9".to_string());
        row.insert(COL_CAFFEINE.to_string(), "200".to_string());
        row.insert(COL_TROUBLE.to_string(), "1".to_string());

        let mut incomplete = row.clone();
        incomplete.remove(COL_SLEEP);

        let dataset = DatasetLoader::load(&RowMapSource::new(vec![row, incomplete])).unwrap();
        assert_eq!(dataset.records().len(), 1);
        assert_eq!(dataset.records()[0].sleep, SleepCategory::Normal);
        assert_eq!(dataset.records()[0].caffeine, CaffeineCategory::Mid);
        assert_eq!(dataset.stats().dropped_rows, 1);
    }

    #[test]
    fn test_empty_dataset() {
        let csv = "age_years,sleep_hours_weekly_avg,caffeine_mg_day1,told_doctor_trouble_sleeping\n";
        let dataset = DatasetLoader::load_csv(csv).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.age_options(), vec![AgeOption::All]);
    }
}
