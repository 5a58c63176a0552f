// Series aligner - Dense, regularly spaced tables from sparse series
use crate::domain::error::SeriesError;
use crate::domain::series::{
    AlignedRow, AlignedTable, Column, GapPolicy, MatchPolicy, SeriesSet, TIMESTAMP_COLUMN,
    TimeWindow,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignOptions {
    pub gap: GapPolicy,
    pub matching: MatchPolicy,
}

impl AlignOptions {
    pub fn with_gap(gap: GapPolicy) -> Self {
        Self {
            gap,
            ..Self::default()
        }
    }
}

/// Lays every series of `set` onto the canonical axis of `window`.
///
/// The axis is built before any sample is looked at, so an empty set still
/// yields `window.len()` rows. Columns follow series name order. Samples off
/// the axis (or outside the window) and non-finite values are dropped; cells
/// with no sample take the gap value.
///
/// With [`MatchPolicy::Exact`], repeated timestamps resolve to the last one
/// in input order. With [`MatchPolicy::Nearest`] the closest sample to a tick
/// wins and ties keep the earlier sample.
pub fn align(
    set: &SeriesSet,
    window: &TimeWindow,
    options: AlignOptions,
) -> Result<AlignedTable, SeriesError> {
    window.validate()?;
    if let Some(name) = set.names().find(|n| *n == TIMESTAMP_COLUMN) {
        return Err(SeriesError::ReservedName(name.to_string()));
    }

    let width = set.len();
    let mut cells: Vec<Vec<Option<f64>>> = vec![vec![None; width]; window.len()];

    for (col, series) in set.iter().enumerate() {
        match options.matching {
            MatchPolicy::Exact => {
                for sample in series.points.iter().filter(|s| s.value.is_finite()) {
                    if let Some(row) = window.index_of(sample.timestamp) {
                        cells[row][col] = Some(sample.value);
                    }
                }
            }
            MatchPolicy::Nearest => {
                let mut best: Vec<Option<i64>> = vec![None; window.len()];
                for sample in series.points.iter().filter(|s| s.value.is_finite()) {
                    if let Some((row, distance)) = window.nearest_index(sample.timestamp) {
                        if best[row].is_none_or(|d| distance < d) {
                            best[row] = Some(distance);
                            cells[row][col] = Some(sample.value);
                        }
                    }
                }
            }
        }
    }

    let columns: Vec<Column> = set
        .names()
        .map(|name| Column::new(name, options.gap))
        .collect();
    let rows = window
        .ticks()
        .zip(cells)
        .map(|(timestamp, values)| AlignedRow::new(timestamp, values, &columns))
        .collect();

    Ok(AlignedTable::from_parts(columns, rows, Some(window.step)))
}
