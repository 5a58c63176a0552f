// Series merger - Combines tables fetched at independent resolutions
use crate::domain::error::SeriesError;
use crate::domain::series::{AlignedRow, AlignedTable, Column};
use std::collections::{BTreeMap, HashMap};

/// Joins tables on the sorted union of their timestamps.
///
/// Nothing is resampled: a 15s table merged with a 60s table keeps every 15s
/// row, and the 60s columns are gap-valued on the rows their table lacks.
/// Gap values come from the policy each input column was built with.
///
/// Columns appear in order of first appearance. A name owned by several
/// inputs is coalesced: the first input (in list order) with an observed cell
/// at a timestamp supplies it. Fill values never shadow an observation.
///
/// The merged step is kept only when every input shares it and the union is
/// still contiguous at that step.
pub fn merge(tables: &[AlignedTable]) -> Result<AlignedTable, SeriesError> {
    if tables.is_empty() {
        return Err(SeriesError::EmptyInput);
    }

    let mut columns: Vec<Column> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut mappings: Vec<Vec<usize>> = Vec::with_capacity(tables.len());
    for table in tables {
        let mapping = table
            .columns()
            .iter()
            .map(|column| {
                *positions.entry(column.name.clone()).or_insert_with(|| {
                    columns.push(column.clone());
                    columns.len() - 1
                })
            })
            .collect();
        mappings.push(mapping);
    }

    let width = columns.len();
    let mut merged: BTreeMap<i64, Vec<Option<f64>>> = BTreeMap::new();
    for (table, mapping) in tables.iter().zip(&mappings) {
        for row in table.rows() {
            let cells = merged
                .entry(row.timestamp)
                .or_insert_with(|| vec![None; width]);
            for (idx, &out) in mapping.iter().enumerate() {
                if cells[out].is_none() {
                    cells[out] = row.observation(idx);
                }
            }
        }
    }

    let rows: Vec<AlignedRow> = merged
        .into_iter()
        .map(|(timestamp, cells)| AlignedRow::new(timestamp, cells, &columns))
        .collect();

    let step = shared_step(tables).filter(|step| {
        rows.windows(2)
            .all(|pair| pair[1].timestamp - pair[0].timestamp == *step)
    });

    Ok(AlignedTable::from_parts(columns, rows, step))
}

fn shared_step(tables: &[AlignedTable]) -> Option<i64> {
    let first = tables.first()?.step()?;
    tables
        .iter()
        .all(|t| t.step() == Some(first))
        .then_some(first)
}
