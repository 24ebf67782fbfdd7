use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::info;

use crate::aggregate::DenseDistribution;
use crate::errors::OutputError;

/// One chart row: `{year, z, <prefix>_1, ..., <prefix>_n}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub year: i64,
    pub z: u8,
    pub fields: Vec<(String, Option<f64>)>,
}

impl SummaryRecord {
    pub fn field(&self, name: &str) -> Option<Option<f64>> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, fraction)| *fraction)
    }
}

// Serialized by hand so keys keep chart order instead of alphabetical order
impl Serialize for SummaryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.fields.len()))?;
        map.serialize_entry("year", &self.year)?;
        map.serialize_entry("z", &self.z)?;
        for (key, fraction) in &self.fields {
            map.serialize_entry(key, fraction)?;
        }
        map.end()
    }
}

/// Reshapes a dense distribution into one record per (year, impact group).
pub fn to_records(dense: &DenseDistribution) -> Vec<SummaryRecord> {
    let prefix = dense.family.prefix();
    let mut records: Vec<SummaryRecord> = dense
        .cells
        .iter()
        .map(|cell| SummaryRecord {
            year: cell.key.year,
            z: cell.key.impact_group,
            fields: cell
                .shares
                .iter()
                .map(|share| (format!("{}_{}", prefix, share.value), share.fraction))
                .collect(),
        })
        .collect();
    records.sort_by_key(|record| (record.year, record.z));
    records
}

pub fn render_json(records: &[SummaryRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Writes `records` as an indented JSON array, creating parent directories.
pub fn write_json(path: &Path, records: &[SummaryRecord]) -> Result<(), OutputError> {
    let write_error = |source: std::io::Error| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent).map_err(write_error)?;
    }

    let file = File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|source| {
        OutputError::Serialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(write_error)?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{CategoryShare, CellDistribution};
    use crate::table::{CategoryFamily, CellKey};

    fn cell(year: i64, group: u8, total: u64, counts: [u64; 4]) -> CellDistribution {
        CellDistribution {
            key: CellKey::new(year, group),
            total,
            shares: counts
                .iter()
                .enumerate()
                .map(|(i, &count)| CategoryShare {
                    value: i as i64 + 1,
                    count,
                    fraction: crate::aggregate::fraction(count, total),
                })
                .collect(),
        }
    }

    #[test]
    fn records_are_sorted_and_prefixed() {
        let dense = DenseDistribution {
            family: CategoryFamily::Cip,
            cells: vec![
                cell(2011, 1, 2, [1, 1, 0, 0]),
                cell(2010, 1, 0, [0, 0, 0, 0]),
                cell(2010, 0, 4, [0, 1, 2, 1]),
            ],
        };

        let records = to_records(&dense);
        let keys: Vec<_> = records.iter().map(|r| (r.year, r.z)).collect();
        assert_eq!(keys, vec![(2010, 0), (2010, 1), (2011, 1)]);
        assert_eq!(records[0].field("cip_3"), Some(Some(0.5)));
        assert_eq!(records[1].field("cip_1"), Some(None));
        assert_eq!(records[2].field("sa_1"), None);
    }

    #[test]
    fn json_keeps_chart_key_order_and_nulls() {
        let dense = DenseDistribution {
            family: CategoryFamily::Sa,
            cells: vec![cell(2010, 0, 1, [0, 1, 0, 0]), cell(2010, 1, 0, [0, 0, 0, 0])],
        };
        let json = render_json(&to_records(&dense)).unwrap();

        let expected = r#"[
  {
    "year": 2010,
    "z": 0,
    "sa_1": 0.0,
    "sa_2": 1.0,
    "sa_3": 0.0,
    "sa_4": 0.0
  },
  {
    "year": 2010,
    "z": 1,
    "sa_1": null,
    "sa_2": null,
    "sa_3": null,
    "sa_4": null
  }
]"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn write_json_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sa_data.json");
        let records = vec![SummaryRecord {
            year: 1999,
            z: 1,
            fields: vec![("sa_1".to_string(), Some(0.25))],
        }];

        write_json(&path, &records).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_json(&records).unwrap());
    }

    #[test]
    fn unwritable_destination_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened as a file
        let err = write_json(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }));
    }
}
