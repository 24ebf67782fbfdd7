use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float64Builder, Int64Builder};
use arrow::compute::{cast, cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use csv::StringRecord;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, info, warn};

use crate::config::{ColumnNames, PipelineConfig};
use crate::errors::InputError;
use crate::table::article_schema;

const READ_BUFFER_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub columns: ColumnNames,
    pub delimiter: Option<u8>,
    pub show_progress: bool,
}

impl From<&PipelineConfig> for LoadOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            columns: config.columns.clone(),
            delimiter: config.delimiter,
            show_progress: config.show_progress,
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            delimiter: None,
            show_progress: false,
        }
    }
}

/// Article table in canonical layout (see [`article_schema`]).
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub batch: RecordBatch,
    pub rows_read: u64,
    /// Rows dropped because their year was missing.
    pub rows_skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Delimited { delimiter: u8, gzip: bool },
    Parquet,
}

fn detect_format(path: &Path, delimiter: Option<u8>) -> Result<InputFormat, InputError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let (stem, gzip) = match name.strip_suffix(".gz") {
        Some(stem) => (stem, true),
        None => (name.as_str(), false),
    };
    let extension = Path::new(stem)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let inferred = match extension {
        "csv" | "txt" | "" => b',',
        "tsv" => b'\t',
        "parquet" | "pq" if !gzip => return Ok(InputFormat::Parquet),
        _ => return Err(InputError::UnsupportedFormat(name.clone())),
    };

    Ok(InputFormat::Delimited {
        delimiter: delimiter.unwrap_or(inferred),
        gzip,
    })
}

/// Reads the article table at `path`, keeping only the four used columns.
pub fn load_articles(path: &Path, options: &LoadOptions) -> Result<LoadedTable, InputError> {
    let format = detect_format(path, options.delimiter)?;
    info!("Loading article table from {} ({:?})", path.display(), format);

    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let progress = row_progress(options.show_progress, path);

    let table = match format {
        InputFormat::Delimited { delimiter, gzip: true } => {
            let decoder = GzDecoder::new(file);
            let reader = BufReader::with_capacity(READ_BUFFER_BYTES, decoder);
            read_delimited(reader, path, delimiter, &options.columns, &progress)?
        }
        InputFormat::Delimited { delimiter, gzip: false } => {
            let reader = BufReader::with_capacity(READ_BUFFER_BYTES, file);
            read_delimited(reader, path, delimiter, &options.columns, &progress)?
        }
        InputFormat::Parquet => read_parquet(file, path, &options.columns, &progress)?,
    };

    progress.finish_with_message(format!("Loaded {} rows", table.rows_read));
    info!(
        "Loaded {} rows from {}",
        table.batch.num_rows(),
        path.display()
    );
    if table.rows_skipped > 0 {
        warn!(
            "Skipped {} rows without a publication year",
            table.rows_skipped
        );
    }

    Ok(table)
}

fn row_progress(enabled: bool, path: &Path) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {spinner} {pos:>10} rows | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(format!("Reading {}", path.display()));
    progress
}

// Accumulates the canonical columns row by row
struct ArticleColumns {
    years: Int64Builder,
    scores: Float64Builder,
    sa_counts: Int64Builder,
    cip_counts: Int64Builder,
    rows_read: u64,
    rows_skipped: u64,
}

impl ArticleColumns {
    fn new() -> Self {
        Self {
            years: Int64Builder::new(),
            scores: Float64Builder::new(),
            sa_counts: Int64Builder::new(),
            cip_counts: Int64Builder::new(),
            rows_read: 0,
            rows_skipped: 0,
        }
    }

    fn push(
        &mut self,
        year: Option<i64>,
        score: Option<f64>,
        sa: Option<i64>,
        cip: Option<i64>,
    ) {
        self.rows_read += 1;
        let Some(year) = year else {
            self.rows_skipped += 1;
            debug!("Row {} has no year, skipping", self.rows_read);
            return;
        };
        self.years.append_value(year);
        self.scores.append_option(score);
        self.sa_counts.append_option(sa);
        self.cip_counts.append_option(cip);
    }

    fn finish(mut self) -> Result<LoadedTable, InputError> {
        let years: ArrayRef = Arc::new(self.years.finish());
        let scores: ArrayRef = Arc::new(self.scores.finish());
        let sa_counts: ArrayRef = Arc::new(self.sa_counts.finish());
        let cip_counts: ArrayRef = Arc::new(self.cip_counts.finish());
        let batch = record_batch!(article_schema(), years, scores, sa_counts, cip_counts)?;

        Ok(LoadedTable {
            batch,
            rows_read: self.rows_read,
            rows_skipped: self.rows_skipped,
        })
    }
}

struct ColumnIndices {
    score: usize,
    year: usize,
    sa_count: usize,
    cip_count: usize,
}

impl ColumnIndices {
    fn resolve(
        headers: &StringRecord,
        columns: &ColumnNames,
        path: &Path,
    ) -> Result<Self, InputError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| InputError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };

        Ok(Self {
            score: find(&columns.score)?,
            year: find(&columns.year)?,
            sa_count: find(&columns.sa_count)?,
            cip_count: find(&columns.cip_count)?,
        })
    }
}

fn read_delimited<R: Read>(
    reader: R,
    path: &Path,
    delimiter: u8,
    columns: &ColumnNames,
    progress: &ProgressBar,
) -> Result<LoadedTable, InputError> {
    let csv_error = |source: csv::Error| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let indices = ColumnIndices::resolve(&headers, columns, path)?;

    let mut table = ArticleColumns::new();
    let mut row = 0u64;
    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        row += 1;

        let year = parse_integer(record.get(indices.year), &columns.year, row)?;
        let score = parse_score(record.get(indices.score), &columns.score, row)?;
        let sa = parse_integer(record.get(indices.sa_count), &columns.sa_count, row)?;
        let cip = parse_integer(record.get(indices.cip_count), &columns.cip_count, row)?;
        table.push(year, score, sa, cip);
        progress.inc(1);
    }

    table.finish()
}

fn read_parquet(
    file: File,
    path: &Path,
    columns: &ColumnNames,
    progress: &ProgressBar,
) -> Result<LoadedTable, InputError> {
    let parquet_error = |source: parquet::errors::ParquetError| InputError::Parquet {
        path: path.to_path_buf(),
        source,
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_error)?;
    for name in columns.required() {
        if builder.schema().field_with_name(name).is_err() {
            return Err(InputError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            });
        }
    }
    let reader = builder.build().map_err(parquet_error)?;

    let mut table = ArticleColumns::new();
    for batch in reader {
        let batch = batch?;
        append_batch(&mut table, &batch, columns, path)?;
        progress.inc(batch.num_rows() as u64);
    }

    table.finish()
}

fn append_batch(
    table: &mut ArticleColumns,
    batch: &RecordBatch,
    columns: &ColumnNames,
    path: &Path,
) -> Result<(), InputError> {
    let first_row = table.rows_read + 1;
    let years = integer_values(batch, &columns.year, path, first_row)?;
    let scores = score_values(batch, &columns.score, path, first_row)?;
    let sa_counts = integer_values(batch, &columns.sa_count, path, first_row)?;
    let cip_counts = integer_values(batch, &columns.cip_count, path, first_row)?;

    let rows = years
        .into_iter()
        .zip(scores)
        .zip(sa_counts)
        .zip(cip_counts);
    for (((year, score), sa), cip) in rows {
        table.push(year, score, sa, cip);
    }

    Ok(())
}

fn column_of<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a ArrayRef, InputError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| InputError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
}

// Renders any column as text so it goes through the delimited-input parsers
fn text_values(column: &ArrayRef) -> Result<ArrayRef, InputError> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(column, &DataType::Utf8, &options)?)
}

/// Year and count columns: float sources must hold whole numbers, text must parse.
fn integer_values(
    batch: &RecordBatch,
    name: &str,
    path: &Path,
    first_row: u64,
) -> Result<Vec<Option<i64>>, InputError> {
    let column = column_of(batch, name, path)?;
    match column.data_type() {
        DataType::Float32 | DataType::Float64 => {
            let floats = cast(column, &DataType::Float64)?;
            floats
                .as_primitive::<Float64Type>()
                .iter()
                .enumerate()
                .map(|(i, value)| match value {
                    None => Ok(None),
                    Some(v) if v.is_nan() => Ok(None),
                    Some(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
                    Some(v) => Err(invalid_value(first_row + i as u64, name, &v.to_string())),
                })
                .collect()
        }
        DataType::Int64 => Ok(column.as_primitive::<Int64Type>().iter().collect()),
        _ => {
            let text = text_values(column)?;
            text.as_string::<i32>()
                .iter()
                .enumerate()
                .map(|(i, raw)| parse_integer(raw, name, first_row + i as u64))
                .collect()
        }
    }
}

fn score_values(
    batch: &RecordBatch,
    name: &str,
    path: &Path,
    first_row: u64,
) -> Result<Vec<Option<f64>>, InputError> {
    let column = column_of(batch, name, path)?;
    if column.data_type().is_numeric() {
        let floats = cast(column, &DataType::Float64)?;
        return Ok(floats
            .as_primitive::<Float64Type>()
            .iter()
            .map(|score| score.filter(|z| !z.is_nan()))
            .collect());
    }

    let text = text_values(column)?;
    text.as_string::<i32>()
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_score(raw, name, first_row + i as u64))
        .collect()
}

// Missing-value spellings written by dataframe exports (pandas defaults)
const NA_MARKERS: [&str; 16] = [
    "", "nan", "-nan", "+nan", "na", "n/a", "<na>", "#n/a", "#n/a n/a", "#na", "null", "none",
    "1.#ind", "-1.#ind", "1.#qnan", "-1.#qnan",
];

fn is_missing(raw: &str) -> bool {
    NA_MARKERS.iter().any(|marker| raw.eq_ignore_ascii_case(marker))
}

fn invalid_value(row: u64, column: &str, raw: &str) -> InputError {
    InputError::InvalidValue {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    }
}

/// Parses an integer field. Whole-valued floats such as `2010.0` are accepted.
fn parse_integer(raw: Option<&str>, column: &str, row: u64) -> Result<Option<i64>, InputError> {
    let raw = raw.unwrap_or_default().trim();
    if is_missing(raw) {
        return Ok(None);
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Some(value));
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(Some(value as i64)),
        _ => Err(invalid_value(row, column, raw)),
    }
}

fn parse_score(raw: Option<&str>, column: &str, row: u64) -> Result<Option<f64>, InputError> {
    let raw = raw.unwrap_or_default().trim();
    if is_missing(raw) {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_nan() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(invalid_value(row, column, raw)),
    }
}
