use std::fs::{self, File};
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::{AnnotationName, FileRecord, ReportType};
use crate::error::DiceError;

pub const LEDGER_HEADERS: [&str; 8] = [
    "case_id",
    "tcga_barcode",
    "sample_type",
    "annotation",
    "file_name",
    "center",
    "platform",
    "report_type",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub case_id: String,
    pub tcga_barcode: String,
    pub sample_type: String,
    pub annotation: String,
    pub file_name: String,
    pub center: String,
    pub platform: String,
    pub report_type: ReportType,
}

impl LedgerRow {
    pub fn new(record: &FileRecord, annotation: &AnnotationName, diced_path: &Utf8Path) -> Self {
        Self {
            case_id: record.case_id().to_string(),
            tcga_barcode: record.barcode().to_string(),
            sample_type: record.sample_type().unwrap_or_default().to_string(),
            annotation: annotation.to_string(),
            file_name: diced_path.to_string(),
            center: record.center().to_string(),
            platform: record.platform().to_string(),
            report_type: annotation.report_type(),
        }
    }
}

pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

/// A ledger being written next to its final location. It replaces the
/// previous ledger only on `commit`; dropping it leaves that ledger intact.
pub struct PendingLedger {
    target: Utf8PathBuf,
    writer: LedgerWriter<NamedTempFile>,
}

impl PendingLedger {
    pub fn create(path: &Utf8Path) -> Result<Self, DiceError> {
        let parent = path
            .parent()
            .ok_or_else(|| DiceError::Ledger(format!("{path}: no parent directory")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DiceError::Ledger(format!("{parent}: {err}")))?;
        let temp = tempfile::Builder::new()
            .prefix(".gdc-dice-ledger")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DiceError::Ledger(format!("{parent}: {err}")))?;
        Ok(Self {
            target: path.to_owned(),
            writer: LedgerWriter::from_writer(temp)?,
        })
    }

    pub fn writer(&mut self) -> &mut LedgerWriter<NamedTempFile> {
        &mut self.writer
    }

    pub fn commit(self) -> Result<usize, DiceError> {
        let (temp, rows) = self.writer.into_inner()?;
        temp.persist(self.target.as_std_path())
            .map_err(|err| DiceError::Ledger(format!("{}: {err}", self.target)))?;
        Ok(rows)
    }
}

impl<W: Write> LedgerWriter<W> {
    pub fn from_writer(inner: W) -> Result<Self, DiceError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(inner);
        // The header goes out first so an empty ledger still has one.
        writer
            .write_record(LEDGER_HEADERS)
            .map_err(|err| DiceError::Ledger(err.to_string()))?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn append(&mut self, row: &LedgerRow) -> Result<(), DiceError> {
        self.writer
            .serialize(row)
            .map_err(|err| DiceError::Ledger(err.to_string()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<usize, DiceError> {
        self.into_inner().map(|(_, rows)| rows)
    }

    fn into_inner(self) -> Result<(W, usize), DiceError> {
        let rows = self.rows;
        let inner = self
            .writer
            .into_inner()
            .map_err(|err| DiceError::Ledger(err.error().to_string()))?;
        Ok((inner, rows))
    }
}

pub fn ledger_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader)
}

pub fn read_ledger(path: &Utf8Path) -> Result<Vec<LedgerRow>, DiceError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| DiceError::Ledger(format!("{path}: {err}")))?;
    ledger_reader(file)
        .deserialize()
        .map(|row| row.map_err(|err| DiceError::Ledger(format!("{path}: {err}"))))
        .collect()
}
