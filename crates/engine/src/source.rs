#![forbid(unsafe_code)]

//! Record Source: a lazy, single-pass, file-ordered sequence of typed input rows.

use crate::error::BatchError;
use br_core::{FieldId, MetadataValueId, NumericIdError};
use csv::StringRecord;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

const BOM: char = '\u{feff}';

/// Shape of one input row, decoded from a header-keyed CSV record.
pub trait InputRow: Sized {
    const REQUIRED_COLUMNS: &'static [&'static str];

    fn from_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, String>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRow<T> {
    /// 1-based line of the row in the input file.
    pub line: u64,
    pub row: T,
}

pub struct RecordSource<R, T> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    record: StringRecord,
    exhausted: bool,
    _row: PhantomData<fn() -> T>,
}

impl<T: InputRow> RecordSource<File, T> {
    pub fn open(path: &Path) -> Result<Self, BatchError> {
        let file = File::open(path).map_err(|err| BatchError::InputUnreadable {
            path: path.to_path_buf(),
            source: csv::Error::from(err),
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read, T: InputRow> RecordSource<R, T> {
    pub fn from_reader(input: R) -> Result<Self, BatchError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        let headers: StringRecord = reader
            .headers()
            .map_err(BatchError::Source)?
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let name = if index == 0 {
                    name.trim_start_matches(BOM)
                } else {
                    name
                };
                name.trim().to_string()
            })
            .collect();
        for &column in T::REQUIRED_COLUMNS {
            if !headers.iter().any(|name| name == column) {
                return Err(BatchError::MissingColumn(column));
            }
        }
        reader.set_headers(headers.clone());
        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
            exhausted: false,
            _row: PhantomData,
        })
    }
}

impl<R: Read, T: InputRow> Iterator for RecordSource<R, T> {
    type Item = Result<SourceRow<T>, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let line = self
                    .record
                    .position()
                    .map(csv::Position::line)
                    .unwrap_or_default();
                Some(
                    T::from_record(&self.record, &self.headers)
                        .map(|row| SourceRow { line, row })
                        .map_err(|reason| BatchError::MalformedRow { line, reason }),
                )
            }
            Ok(false) => {
                self.exhausted = true;
                None
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(BatchError::Source(err)))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMetadataRow {
    metadata_value_id: String,
    #[serde(default)]
    item_id: String,
    #[serde(default)]
    metadata_field_id: String,
    text_value: String,
}

/// `metadata_value_id, item_id, metadata_field_id, text_value`. Empty value id means create.
///
/// `item_id` is kept raw; only a create reads it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataRow {
    pub value_id: Option<MetadataValueId>,
    pub item_id: String,
    pub field: Option<FieldId>,
    pub text: String,
}

impl InputRow for MetadataRow {
    const REQUIRED_COLUMNS: &'static [&'static str] = &["metadata_value_id", "text_value"];

    fn from_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, String> {
        let raw: RawMetadataRow = record
            .deserialize(Some(headers))
            .map_err(|err| err.to_string())?;
        Ok(Self {
            value_id: optional_id(&raw.metadata_value_id, "metadata_value_id", MetadataValueId::parse)?,
            item_id: raw.item_id,
            field: optional_id(&raw.metadata_field_id, "metadata_field_id", FieldId::parse)?,
            text: raw.text_value,
        })
    }
}

/// `item_handle, collection_handle`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MembershipRow {
    pub item_handle: String,
    pub collection_handle: String,
}

impl InputRow for MembershipRow {
    const REQUIRED_COLUMNS: &'static [&'static str] = &["item_handle", "collection_handle"];

    fn from_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, String> {
        record
            .deserialize(Some(headers))
            .map_err(|err| err.to_string())
    }
}

pub(crate) fn optional_id<T>(
    raw: &str,
    column: &str,
    parse: fn(&str) -> Result<T, NumericIdError>,
) -> Result<Option<T>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse(raw)
        .map(Some)
        .map_err(|err| format!("{column} {raw:?}: {err}"))
}
