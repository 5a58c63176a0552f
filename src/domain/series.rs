// Time series domain models
use super::error::SeriesError;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Column name every aligned row carries its axis timestamp under.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl From<(i64, f64)> for Sample {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Self::new(timestamp, value)
    }
}

/// One named metric. Points may arrive unsorted and with repeated timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub name: String,
    pub points: Vec<Sample>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// Series keyed by name, all describing the same window.
///
/// Backed by a sorted map so anything built from it comes out in name order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesSet {
    series: BTreeMap<String, Series>,
}

impl SeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a series. A name seen before has its points appended to the
    /// existing entry.
    pub fn insert(&mut self, series: Series) {
        match self.series.get_mut(&series.name) {
            Some(existing) => existing.points.extend(series.points),
            None => {
                self.series.insert(series.name.clone(), series);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Series> {
        self.series.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<Series> for SeriesSet {
    fn from_iter<I: IntoIterator<Item = Series>>(iter: I) -> Self {
        let mut set = SeriesSet::new();
        for series in iter {
            set.insert(series);
        }
        set
    }
}

/// Inclusive `[from, to]` bounds in epoch seconds with the axis spacing.
///
/// The canonical axis is `from, from + step, ...` up to and including `to`
/// when it lands on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
    pub step: i64,
}

impl TimeWindow {
    pub fn new(from: i64, to: i64, step: i64) -> Result<Self, SeriesError> {
        let window = Self { from, to, step };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), SeriesError> {
        if self.step <= 0 {
            return Err(SeriesError::InvalidWindow(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if self.from > self.to {
            return Err(SeriesError::InvalidWindow(format!(
                "from ({}) is after to ({})",
                self.from, self.to
            )));
        }
        Ok(())
    }

    /// Number of axis ticks. Assumes a validated window.
    pub fn len(&self) -> usize {
        ((self.to - self.from) / self.step) as usize + 1
    }

    pub fn ticks(&self) -> impl Iterator<Item = i64> + use<> {
        (self.from..=self.to).step_by(self.step as usize)
    }

    /// Row index for a timestamp that sits exactly on the axis.
    pub fn index_of(&self, timestamp: i64) -> Option<usize> {
        let offset = timestamp - self.from;
        if offset < 0 || timestamp > self.to || offset % self.step != 0 {
            return None;
        }
        Some((offset / self.step) as usize)
    }

    /// Closest axis tick within `step / 2`, with its distance. Ties pick the
    /// earlier tick.
    pub fn nearest_index(&self, timestamp: i64) -> Option<(usize, i64)> {
        let offset = timestamp - self.from;
        let below = offset.div_euclid(self.step);
        let last = (self.len() - 1) as i64;

        [below, below + 1]
            .into_iter()
            .filter(|k| (0..=last).contains(k))
            .map(|k| (k, (offset - k * self.step).abs()))
            .filter(|(_, distance)| distance * 2 <= self.step)
            .min_by_key(|(_, distance)| *distance)
            .map(|(k, distance)| (k as usize, distance))
    }

    /// Re-snaps the window to a coarser step. Finer or equal steps leave it
    /// untouched.
    pub fn with_min_step(&self, step: i64) -> TimeWindow {
        if step <= self.step {
            return *self;
        }
        TimeWindow {
            from: self.from.div_euclid(step) * step,
            to: self.to.div_euclid(step) * step,
            step,
        }
    }
}

/// How a cell with no matching sample is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum GapPolicy {
    /// `null`: keeps outages visible.
    #[default]
    #[serde(rename = "null")]
    NullFill,
    /// `0`: flat line, for tiles that want a continuous series.
    #[serde(rename = "zero")]
    ZeroFill,
}

impl GapPolicy {
    pub fn fill(&self) -> Option<f64> {
        match self {
            GapPolicy::NullFill => None,
            GapPolicy::ZeroFill => Some(0.0),
        }
    }
}

/// How a sample timestamp is mapped onto the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    Exact,
    /// Closest tick within half a step, for backends whose timestamps jitter.
    Nearest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub gap: GapPolicy,
}

impl Column {
    pub fn new(name: impl Into<String>, gap: GapPolicy) -> Self {
        Self {
            name: name.into(),
            gap,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub timestamp: i64,
    /// One cell per table column, in column order, gap value already applied.
    pub values: Vec<Option<f64>>,
    /// Which cells hold a sample rather than a gap value.
    pub observed: Vec<bool>,
}

impl AlignedRow {
    /// Builds a row from raw observations, filling each empty cell with its
    /// column's gap value.
    pub fn new(timestamp: i64, observations: Vec<Option<f64>>, columns: &[Column]) -> Self {
        let observed = observations.iter().map(Option::is_some).collect();
        let values = observations
            .into_iter()
            .zip(columns)
            .map(|(value, column)| value.or(column.gap.fill()))
            .collect();
        Self {
            timestamp,
            values,
            observed,
        }
    }

    /// The cell at `idx` if it was observed.
    pub fn observation(&self, idx: usize) -> Option<f64> {
        match self.observed.get(idx) {
            Some(true) => self.values[idx],
            _ => None,
        }
    }
}

/// Rows in strictly increasing timestamp order, one cell per column.
///
/// `step` is the spacing the rows were built at; merged tables whose inputs
/// disagree on spacing carry `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    columns: Vec<Column>,
    rows: Vec<AlignedRow>,
    step: Option<i64>,
}

impl AlignedTable {
    pub(crate) fn from_parts(columns: Vec<Column>, rows: Vec<AlignedRow>, step: Option<i64>) -> Self {
        Self {
            columns,
            rows,
            step,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn step(&self) -> Option<i64> {
        self.step
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.iter().map(|row| row.timestamp)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }

    /// Cell lookup. The outer `None` means no such row or column.
    pub fn value(&self, timestamp: i64, name: &str) -> Option<Option<f64>> {
        let idx = self.column_index(name)?;
        let pos = self
            .rows
            .binary_search_by_key(&timestamp, |row| row.timestamp)
            .ok()?;
        Some(self.rows[pos].values[idx])
    }

    /// Most recent observed value of a column, ignoring gap fill.
    pub fn latest_observed(&self, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.iter().rev().find_map(|row| row.observation(idx))
    }

    /// True when no cell holds an observation; an observed zero counts.
    pub fn is_all_gap(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.observed.iter().all(|observed| !observed))
    }
}

struct RowRef<'a> {
    columns: &'a [Column],
    row: &'a AlignedRow,
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + 1))?;
        map.serialize_entry(TIMESTAMP_COLUMN, &self.row.timestamp)?;
        for (column, value) in self.columns.iter().zip(&self.row.values) {
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}

/// Serializes as `[{ "timestamp": ts, "<series>": value | null, ... }, ...]`.
impl Serialize for AlignedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowRef {
                columns: &self.columns,
                row,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_validation() {
        assert!(TimeWindow::new(0, 60, 15).is_ok());
        assert!(TimeWindow::new(60, 60, 15).is_ok());
        assert!(matches!(
            TimeWindow::new(0, 60, 0),
            Err(SeriesError::InvalidWindow(_))
        ));
        assert!(matches!(
            TimeWindow::new(61, 60, 15),
            Err(SeriesError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_window_ticks() {
        let window = TimeWindow::new(1000, 1060, 15).unwrap();
        assert_eq!(window.len(), 5);
        assert_eq!(window.ticks().collect::<Vec<_>>(), vec![1000, 1015, 1030, 1045, 1060]);

        // `to` off the grid is not a tick
        let window = TimeWindow::new(1000, 1050, 15).unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(window.ticks().last(), Some(1045));
    }

    #[test]
    fn test_index_of() {
        let window = TimeWindow::new(1000, 1060, 15).unwrap();
        assert_eq!(window.index_of(1000), Some(0));
        assert_eq!(window.index_of(1045), Some(3));
        assert_eq!(window.index_of(1046), None);
        assert_eq!(window.index_of(985), None);
        assert_eq!(window.index_of(1075), None);
    }

    #[test]
    fn test_nearest_index() {
        let window = TimeWindow::new(1000, 1060, 20).unwrap();
        assert_eq!(window.nearest_index(1003), Some((0, 3)));
        assert_eq!(window.nearest_index(1017), Some((1, 3)));
        // halfway between ticks goes to the earlier one
        assert_eq!(window.nearest_index(1010), Some((0, 10)));
        assert_eq!(window.nearest_index(990), Some((0, 10)));
        assert_eq!(window.nearest_index(989), None);
        assert_eq!(window.nearest_index(1070), Some((3, 10)));
        assert_eq!(window.nearest_index(1071), None);
    }

    #[test]
    fn test_with_min_step() {
        let window = TimeWindow::new(1_000_035, 1_003_635, 15).unwrap();
        assert_eq!(window.with_min_step(15), window);
        assert_eq!(window.with_min_step(5), window);

        let coarse = window.with_min_step(60);
        assert_eq!(coarse.step, 60);
        assert_eq!(coarse.from, 1_000_020);
        assert_eq!(coarse.to, 1_003_620);
        assert!(coarse.validate().is_ok());
    }

    #[test]
    fn test_series_set_merges_duplicate_names() {
        let set: SeriesSet = vec![
            Series::new("b", vec![Sample::new(1, 1.0)]),
            Series::new("a", vec![]),
            Series::new("b", vec![Sample::new(2, 2.0)]),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.get("b").unwrap().points.len(), 2);
    }

    #[test]
    fn test_table_serializes_as_row_objects() {
        let columns = vec![
            Column::new("a", GapPolicy::NullFill),
            Column::new("b", GapPolicy::ZeroFill),
        ];
        let rows = vec![
            AlignedRow::new(1000, vec![Some(5.0), None], &columns),
            AlignedRow::new(1015, vec![None, Some(2.5)], &columns),
        ];
        let table = AlignedTable::from_parts(columns, rows, Some(15));

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "timestamp": 1000, "a": 5.0, "b": 0.0 },
                { "timestamp": 1015, "a": null, "b": 2.5 },
            ])
        );
    }

    #[test]
    fn test_is_all_gap() {
        let columns = vec![
            Column::new("a", GapPolicy::NullFill),
            Column::new("b", GapPolicy::ZeroFill),
        ];
        let gap_row = AlignedRow::new(0, vec![None, None], &columns);
        assert_eq!(gap_row.values, vec![None, Some(0.0)]);
        let table = AlignedTable::from_parts(columns.clone(), vec![gap_row.clone()], Some(15));
        assert!(table.is_all_gap());
        assert_eq!(table.latest_observed("b"), None);

        let observed = AlignedRow::new(15, vec![Some(0.0), None], &columns);
        let table = AlignedTable::from_parts(columns, vec![gap_row, observed], Some(15));
        assert!(!table.is_all_gap());
        assert_eq!(table.value(15, "a"), Some(Some(0.0)));
        assert_eq!(table.value(0, "a"), Some(None));
        assert_eq!(table.value(30, "a"), None);
    }

    #[test]
    fn test_latest_observed_skips_fill_zeros() {
        let columns = vec![Column::new("bytes", GapPolicy::ZeroFill)];
        let rows = vec![
            AlignedRow::new(0, vec![Some(4096.0)], &columns),
            AlignedRow::new(15, vec![None], &columns),
        ];
        let table = AlignedTable::from_parts(columns, rows, Some(15));

        assert_eq!(table.column("bytes").unwrap(), vec![Some(4096.0), Some(0.0)]);
        assert_eq!(table.latest_observed("bytes"), Some(4096.0));
        assert_eq!(table.latest_observed("missing"), None);
    }

    #[test]
    fn test_gap_policy_deserializes_from_short_names() {
        let policy: GapPolicy = serde_json::from_str("\"zero\"").unwrap();
        assert_eq!(policy, GapPolicy::ZeroFill);
        let policy: GapPolicy = serde_json::from_str("\"null\"").unwrap();
        assert_eq!(policy, GapPolicy::NullFill);
        assert_eq!(GapPolicy::default(), GapPolicy::NullFill);
    }
}
