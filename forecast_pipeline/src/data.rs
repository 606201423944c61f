//! Time-indexed frames and loading them from disk
//!
//! A [`TimeSeriesFrame`] is the unit every transform and estimator consumes: one
//! row per timestamp, the timestamp acting as the index rather than as a data
//! column. Frames are sorted ascending on construction and never hold duplicate
//! timestamps, so downstream code can rely on positional order matching time
//! order.

use crate::error::{ForecastError, Result};
use crate::utils::parse_timestamp;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::{CsvReader, DataFrame, DataType, NamedFrom, SerReader, Series, TimeUnit};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fs::File;
use std::iter;
use std::path::Path;

/// Values of a single frame column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    /// An all-missing numeric column
    pub fn missing_numeric(len: usize) -> Self {
        ColumnData::Numeric(vec![None; len])
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }
}

/// A named column, used to build frames and to copy values out of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Numeric(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn to_series(&self) -> Series {
        match &self.data {
            ColumnData::Numeric(values) => {
                let values: Vec<Option<f64>> =
                    values.iter().map(|v| v.filter(|x| !x.is_nan())).collect();
                Series::new(&self.name, values)
            }
            ColumnData::Text(values) => Series::new(&self.name, values.as_slice()),
        }
    }

    fn from_series(series: &Series) -> Result<Self> {
        let name = series.name().to_string();
        if matches!(series.dtype(), DataType::Float64) {
            return Ok(Column::numeric(name, series.f64()?.into_iter().collect()));
        }
        let text = series.cast(&DataType::Utf8)?;
        let values = text
            .utf8()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(Column::text(name, values))
    }
}

/// Table indexed by a single ordered timestamp key
#[derive(Debug, Clone)]
pub struct TimeSeriesFrame {
    /// Name of the time column forming the index
    time_column: String,
    /// Strictly increasing timestamps, in step with the time column of `df`
    index: Vec<NaiveDateTime>,
    /// Time column first, then the data columns. Numeric data is `Float64`
    /// with nulls for missing values, everything else is `Utf8`.
    df: DataFrame,
}

/// Serialized form of a frame
#[derive(Serialize, Deserialize)]
struct FrameRecord {
    time_column: String,
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl TimeSeriesFrame {
    /// Create a frame, sorting rows by time.
    ///
    /// Rejects duplicate timestamps, duplicate column names, columns whose length
    /// differs from the index and a data column carrying the time column's name.
    pub fn new(
        time_column: impl Into<String>,
        index: Vec<NaiveDateTime>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let series = columns.iter().map(Column::to_series).collect();
        Self::from_series(time_column, index, series)
    }

    /// Create a frame from polars series holding the data columns.
    ///
    /// Numeric series are stored as `Float64` with `NaN` turned into null; any
    /// other type is stored as text.
    pub fn from_series(
        time_column: impl Into<String>,
        index: Vec<NaiveDateTime>,
        series: Vec<Series>,
    ) -> Result<Self> {
        let time_column = time_column.into();

        let mut seen = HashSet::new();
        for s in &series {
            if s.name() == time_column {
                return Err(ForecastError::DataError(format!(
                    "Column '{}' duplicates the time index; the time column must be the sole index",
                    s.name()
                )));
            }
            if !seen.insert(s.name()) {
                return Err(ForecastError::DataError(format!(
                    "Duplicate column name '{}'",
                    s.name()
                )));
            }
            if s.len() != index.len() {
                return Err(ForecastError::DataError(format!(
                    "Column '{}' has {} values but the index has {}",
                    s.name(),
                    s.len(),
                    index.len()
                )));
            }
        }

        let mut columns = Vec::with_capacity(series.len() + 1);
        columns.push(time_series(&time_column, &index)?);
        for s in &series {
            columns.push(normalize_series(s)?);
        }
        let df = DataFrame::new(columns)?;

        if index.windows(2).all(|w| w[0] < w[1]) {
            return Ok(Self {
                time_column,
                index,
                df,
            });
        }

        let df = df.sort([time_column.as_str()], false, false)?;
        let index = timestamps(df.column(&time_column)?)?;
        if let Some(pair) = index.windows(2).find(|w| w[0] == w[1]) {
            return Err(ForecastError::DataError(format!(
                "Duplicate timestamp {} in index",
                pair[0]
            )));
        }
        Ok(Self {
            time_column,
            index,
            df,
        })
    }

    /// Create an all-numeric frame. `NaN` inputs become missing values.
    pub fn from_numeric<I, S>(
        time_column: impl Into<String>,
        index: Vec<NaiveDateTime>,
        columns: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let columns = columns
            .into_iter()
            .map(|(name, values)| Column::numeric(name, values.into_iter().map(Some).collect()))
            .collect();
        Self::new(time_column, index, columns)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of data columns
    pub fn width(&self) -> usize {
        self.df.width().saturating_sub(1)
    }

    /// Name of the time column forming the index
    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    /// Timestamps, ascending
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// The underlying DataFrame, time column first
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.last().copied()
    }

    /// Row position of `timestamp`, if present
    pub fn position(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.index.binary_search(&timestamp).ok()
    }

    /// Data column names in frame order
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .filter(|name| *name != self.time_column)
            .map(str::to_string)
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        name != self.time_column && self.df.column(name).is_ok()
    }

    /// Names of the data columns that are not numeric
    pub fn non_numeric_columns(&self) -> Vec<String> {
        self.df
            .get_columns()
            .iter()
            .filter(|s| s.name() != self.time_column)
            .filter(|s| !matches!(s.dtype(), DataType::Float64))
            .map(|s| s.name().to_string())
            .collect()
    }

    /// A data column as a polars series
    pub fn series(&self, name: &str) -> Result<&Series> {
        if name == self.time_column {
            return Err(ForecastError::DataError(format!(
                "Column '{}' is the time index",
                name
            )));
        }
        self.df
            .column(name)
            .map_err(|_| ForecastError::DataError(format!("Column '{}' not found", name)))
    }

    /// A numeric data column as a polars series
    pub fn numeric_series(&self, name: &str) -> Result<&Series> {
        let series = self.series(name)?;
        if !matches!(series.dtype(), DataType::Float64) {
            return Err(ForecastError::NonNumericColumnError(vec![name.to_string()]));
        }
        Ok(series)
    }

    /// Values of a numeric column
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.numeric_series(name)?.f64()?.into_iter().collect())
    }

    /// Copy of one data column
    pub fn column(&self, name: &str) -> Result<Column> {
        Column::from_series(self.series(name)?)
    }

    /// Copies of every data column, in frame order
    pub fn columns(&self) -> Result<Vec<Column>> {
        self.df
            .get_columns()
            .iter()
            .filter(|s| s.name() != self.time_column)
            .map(Column::from_series)
            .collect()
    }

    /// Frame without the named columns. Names that are not present are ignored.
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let names: Vec<&str> = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| *n != self.time_column)
            .collect();
        self.with_df(self.df.drop_many(&names))
    }

    /// Frame with `column` replacing the same-named column, or appended.
    pub fn with_column(&self, column: Column) -> Result<Self> {
        self.with_series(column.to_series())
    }

    /// Frame with `series` replacing the same-named column, or appended.
    pub fn with_series(&self, series: Series) -> Result<Self> {
        if series.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' has {} values but the frame has {} rows",
                series.name(),
                series.len(),
                self.len()
            )));
        }
        if series.name() == self.time_column {
            return Err(ForecastError::DataError(format!(
                "Cannot add column '{}': it names the time index",
                series.name()
            )));
        }

        let mut df = self.df.clone();
        df.with_column(normalize_series(&series)?)?;
        Ok(self.with_df(df))
    }

    /// Frame restricted to `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        if names.iter().any(|n| !self.has_column(n.as_ref())) {
            return Err(ForecastError::ColumnMismatchError {
                expected: names.iter().map(|n| n.as_ref().to_string()).collect(),
                found: self.column_names(),
            });
        }
        let selection: Vec<&str> = iter::once(self.time_column.as_str())
            .chain(names.iter().map(|n| n.as_ref()))
            .collect();
        Ok(self.with_df(self.df.select(selection)?))
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Self {
        self.slice_rows(0, n.min(self.len()))
    }

    /// Last `n` rows
    pub fn tail(&self, n: usize) -> Self {
        self.slice_rows(self.len().saturating_sub(n), self.len())
    }

    /// Rows with timestamp at or after `start`
    pub fn rows_from(&self, start: NaiveDateTime) -> Self {
        let first = self.index.partition_point(|t| *t < start);
        self.slice_rows(first, self.len())
    }

    /// Split into rows `<= boundary` and rows `> boundary`.
    pub fn split_at_timestamp(&self, boundary: NaiveDateTime) -> (Self, Self) {
        let split = self.index.partition_point(|t| *t <= boundary);
        (self.slice_rows(0, split), self.slice_rows(split, self.len()))
    }

    /// Append `later`, whose rows must all come strictly after this frame's and
    /// whose columns must match this frame's names, order and types.
    pub fn concat(&self, later: &TimeSeriesFrame) -> Result<Self> {
        if later.time_column != self.time_column {
            return Err(ForecastError::DataError(format!(
                "Cannot concatenate frames indexed by '{}' and '{}'",
                self.time_column, later.time_column
            )));
        }
        if later.column_names() != self.column_names() {
            return Err(ForecastError::ColumnMismatchError {
                expected: self.column_names(),
                found: later.column_names(),
            });
        }
        if let (Some(last), Some(first)) = (self.last_timestamp(), later.first_timestamp()) {
            if first <= last {
                return Err(ForecastError::DataError(format!(
                    "Cannot concatenate: frame starting at {} does not follow frame ending at {}",
                    first, last
                )));
            }
        }
        if let Some(name) = self
            .column_names()
            .into_iter()
            .zip(self.df.dtypes().into_iter().skip(1))
            .zip(later.df.dtypes().into_iter().skip(1))
            .find(|((_, a), b)| a != b)
            .map(|((name, _), _)| name)
        {
            return Err(ForecastError::DataError(format!(
                "Column '{}' changes type between frames",
                name
            )));
        }

        let df = self.df.vstack(&later.df)?;
        let mut index = self.index.clone();
        index.extend_from_slice(&later.index);
        Ok(Self {
            time_column: self.time_column.clone(),
            index,
            df,
        })
    }

    /// Overwrite one value of a numeric column
    pub fn set_numeric(&mut self, name: &str, row: usize, value: Option<f64>) -> Result<()> {
        let mut values = self.numeric(name)?;
        if row >= values.len() {
            return Err(ForecastError::DataError(format!(
                "Row {} out of bounds for frame with {} rows",
                row,
                values.len()
            )));
        }
        values[row] = value.filter(|x| !x.is_nan());
        self.df.with_column(Series::new(name, values))?;
        Ok(())
    }

    /// Frame without any row holding a missing value
    pub fn drop_missing_rows(&self) -> Result<Self> {
        let df = self.df.drop_nulls::<String>(None)?;
        let index = timestamps(df.column(&self.time_column)?)?;
        Ok(Self {
            time_column: self.time_column.clone(),
            index,
            df,
        })
    }

    fn slice_rows(&self, start: usize, end: usize) -> Self {
        let start = start.min(end);
        Self {
            time_column: self.time_column.clone(),
            index: self.index[start..end].to_vec(),
            df: self.df.slice(start as i64, end - start),
        }
    }

    /// Same rows, new columns
    fn with_df(&self, df: DataFrame) -> Self {
        Self {
            time_column: self.time_column.clone(),
            index: self.index.clone(),
            df,
        }
    }

    fn to_record(&self) -> Result<FrameRecord> {
        Ok(FrameRecord {
            time_column: self.time_column.clone(),
            index: self.index.clone(),
            columns: self.columns()?,
        })
    }
}

impl PartialEq for TimeSeriesFrame {
    fn eq(&self, other: &Self) -> bool {
        self.time_column == other.time_column
            && self.index == other.index
            && self.df.frame_equal_missing(&other.df)
    }
}

impl Serialize for TimeSeriesFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeSeriesFrame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let record = FrameRecord::deserialize(deserializer)?;
        TimeSeriesFrame::new(record.time_column, record.index, record.columns)
            .map_err(serde::de::Error::custom)
    }
}

/// Stored form of a data column: `Float64` without `NaN`, or `Utf8`
fn normalize_series(series: &Series) -> Result<Series> {
    let dtype = series.dtype();
    if dtype.is_numeric() {
        let cast = series.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        return Ok(Series::new(series.name(), values));
    }
    if matches!(dtype, DataType::Utf8) {
        return Ok(series.clone());
    }
    Ok(series.cast(&DataType::Utf8)?)
}

/// Time column stored as millisecond datetimes
fn time_series(name: &str, index: &[NaiveDateTime]) -> Result<Series> {
    let epoch = unix_epoch()?;
    let millis: Vec<i64> = index
        .iter()
        .map(|t| (*t - epoch).num_milliseconds())
        .collect();
    Ok(Series::new(name, millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

/// Timestamps back out of a column written by [`time_series`]
fn timestamps(series: &Series) -> Result<Vec<NaiveDateTime>> {
    let epoch = unix_epoch()?;
    let raw = series.cast(&DataType::Int64)?;
    let values = raw.i64()?;
    values
        .into_iter()
        .map(|v| {
            let millis = v.ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Time column '{}' contains missing values",
                    series.name()
                ))
            })?;
            offset_from_epoch(epoch, Duration::milliseconds(millis))
        })
        .collect()
}

/// Data loader for per-entity time series files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a frame from a CSV file, indexing it by `time_column`
    pub fn from_csv<P: AsRef<Path>>(path: P, time_column: &str) -> Result<TimeSeriesFrame> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df, time_column)
    }

    /// Index a polars DataFrame by `time_column`.
    ///
    /// Numeric columns stay numeric, everything else becomes text.
    pub fn from_dataframe(df: &DataFrame, time_column: &str) -> Result<TimeSeriesFrame> {
        let time = df.column(time_column).map_err(|_| {
            ForecastError::ConfigurationError(format!(
                "Time column '{}' not found in data",
                time_column
            ))
        })?;
        let index = Self::parse_time_column(time)?;

        let series = df
            .get_columns()
            .iter()
            .filter(|s| s.name() != time_column)
            .cloned()
            .collect();

        TimeSeriesFrame::from_series(time_column, index, series)
    }

    fn parse_time_column(series: &Series) -> Result<Vec<NaiveDateTime>> {
        let missing = || {
            ForecastError::DataError(format!(
                "Time column '{}' contains missing values",
                series.name()
            ))
        };

        match series.dtype() {
            DataType::Utf8 => series
                .utf8()?
                .into_iter()
                .map(|v| v.ok_or_else(missing).and_then(parse_timestamp))
                .collect(),
            DataType::Date => {
                let days = series.cast(&DataType::Int32)?;
                let epoch = unix_epoch()?;
                days.i32()?
                    .into_iter()
                    .map(|v| {
                        let d = v.ok_or_else(missing)?;
                        offset_from_epoch(epoch, Duration::days(i64::from(d)))
                    })
                    .collect()
            }
            DataType::Datetime(unit, _) => {
                let unit = *unit;
                let raw = series.cast(&DataType::Int64)?;
                raw.i64()?
                    .into_iter()
                    .map(|v| datetime_from_raw(v.ok_or_else(missing)?, unit))
                    .collect()
            }
            DataType::Int64 => series
                .i64()?
                .into_iter()
                .map(|v| datetime_from_raw(v.ok_or_else(missing)?, TimeUnit::Milliseconds))
                .collect(),
            other => Err(ForecastError::DataError(format!(
                "Unsupported type {:?} for time column '{}'",
                other,
                series.name()
            ))),
        }
    }
}

fn unix_epoch() -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ForecastError::DataError("Invalid epoch".to_string()))
}

fn offset_from_epoch(epoch: NaiveDateTime, offset: Duration) -> Result<NaiveDateTime> {
    epoch.checked_add_signed(offset).ok_or_else(|| {
        ForecastError::DataError(format!("Timestamp offset {} out of range", offset))
    })
}

fn datetime_from_raw(value: i64, unit: TimeUnit) -> Result<NaiveDateTime> {
    let offset = match unit {
        TimeUnit::Nanoseconds => Duration::nanoseconds(value),
        TimeUnit::Microseconds => Duration::microseconds(value),
        TimeUnit::Milliseconds => Duration::milliseconds(value),
    };
    offset_from_epoch(unix_epoch()?, offset)
}
