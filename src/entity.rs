//! Identifying the time series held in one input file

use crate::error::{ManyModelsError, Result};
use forecast_pipeline::{ColumnData, TimeSeriesFrame};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Tag under which the model type is recorded next to the id values
pub const MODEL_TYPE_TAG: &str = "ModelType";

/// Key/value tags identifying one entity, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityTags(BTreeMap<String, String>);

impl EntityTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags from the first row of each id column.
    ///
    /// Every row of an entity file is expected to carry the same id values, so
    /// only the first one is read.
    pub fn from_first_row(frame: &TimeSeriesFrame, id_columns: &[String]) -> Result<Self> {
        if id_columns.is_empty() {
            return Err(ManyModelsError::SettingsError(
                "At least one timeseries id column is required".to_string(),
            ));
        }
        if frame.is_empty() {
            return Err(ManyModelsError::SettingsError(
                "Cannot read timeseries ids from an empty frame".to_string(),
            ));
        }

        let mut tags = Self::new();
        for name in id_columns {
            if !frame.has_column(name) {
                return Err(ManyModelsError::SettingsError(format!(
                    "Timeseries id column '{}' not found in data",
                    name
                )));
            }
            let column = frame.head(1).column(name)?;
            let value = match column.data() {
                ColumnData::Text(values) => values.first().cloned().flatten(),
                ColumnData::Numeric(values) => {
                    values.first().copied().flatten().map(|v| v.to_string())
                }
            };
            let value = value.ok_or_else(|| {
                ManyModelsError::SettingsError(format!(
                    "Timeseries id column '{}' is missing in the first row",
                    name
                ))
            })?;
            tags.insert(name.clone(), value);
        }
        Ok(tags)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// These tags plus the model type tag
    pub fn with_model_type(&self, model_type: &str) -> Self {
        let mut tags = self.clone();
        tags.insert(MODEL_TYPE_TAG, model_type);
        tags
    }

    /// `<model_type>_<id values ordered by id column name>`
    pub fn model_name(&self, model_type: &str) -> String {
        let values: Vec<&str> = self
            .iter()
            .filter(|(k, _)| *k != MODEL_TYPE_TAG)
            .map(|(_, v)| v)
            .collect();
        format!("{}_{}", model_type, values.join("_"))
    }

    /// File-name-safe rendering, `key-value` pairs joined by `__`.
    ///
    /// Every byte other than an ASCII letter, digit or `.` is written as `%XX`,
    /// so distinct tag sets never share a stem.
    pub fn file_stem(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}-{}", escape(k), escape(v)))
            .collect::<Vec<_>>()
            .join("__")
    }
}

fn escape(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}

impl fmt::Display for EntityTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// CSV files directly inside `dir`, sorted by path
pub fn entity_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
