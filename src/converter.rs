use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::FileRecord;
use crate::error::DiceError;
use crate::fs_util;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConverterId {
    Clinical,
    Copy,
    MagetabDataMatrix,
    Maf,
    SegBroad,
    SegHarvard,
    SegHarvardLowpass,
    SegMskcc2,
    Tsv2IdTsv,
    UnzipTsv2IdTsv,
    Tsv2Magetab,
    UnzipTsv2Magetab,
    Fpkm2Magetab,
    UnzipFpkm2Magetab,
}

impl ConverterId {
    pub const ALL: [ConverterId; 14] = [
        ConverterId::Clinical,
        ConverterId::Copy,
        ConverterId::MagetabDataMatrix,
        ConverterId::Maf,
        ConverterId::SegBroad,
        ConverterId::SegHarvard,
        ConverterId::SegHarvardLowpass,
        ConverterId::SegMskcc2,
        ConverterId::Tsv2IdTsv,
        ConverterId::UnzipTsv2IdTsv,
        ConverterId::Tsv2Magetab,
        ConverterId::UnzipTsv2Magetab,
        ConverterId::Fpkm2Magetab,
        ConverterId::UnzipFpkm2Magetab,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConverterId::Clinical => "clinical",
            ConverterId::Copy => "copy",
            ConverterId::MagetabDataMatrix => "magetab_data_matrix",
            ConverterId::Maf => "maf",
            ConverterId::SegBroad => "seg_broad",
            ConverterId::SegHarvard => "seg_harvard",
            ConverterId::SegHarvardLowpass => "seg_harvardlowpass",
            ConverterId::SegMskcc2 => "seg_mskcc2",
            ConverterId::Tsv2IdTsv => "tsv2idtsv",
            ConverterId::UnzipTsv2IdTsv => "unzip_tsv2idtsv",
            ConverterId::Tsv2Magetab => "tsv2magetab",
            ConverterId::UnzipTsv2Magetab => "unzip_tsv2magetab",
            ConverterId::Fpkm2Magetab => "fpkm2magetab",
            ConverterId::UnzipFpkm2Magetab => "unzip_fpkm2magetab",
        }
    }

    pub fn base(&self) -> ConverterId {
        match self {
            ConverterId::UnzipTsv2IdTsv => ConverterId::Tsv2IdTsv,
            ConverterId::UnzipTsv2Magetab => ConverterId::Tsv2Magetab,
            ConverterId::UnzipFpkm2Magetab => ConverterId::Fpkm2Magetab,
            other => *other,
        }
    }

    pub fn is_gzipped(&self) -> bool {
        self.base() != *self
    }

    pub fn extension(&self) -> &'static str {
        match self.base() {
            ConverterId::Clinical => "clin.txt",
            ConverterId::Maf => "maf.txt",
            ConverterId::SegBroad
            | ConverterId::SegHarvard
            | ConverterId::SegHarvardLowpass
            | ConverterId::SegMskcc2 => "seg.txt",
            ConverterId::MagetabDataMatrix
            | ConverterId::Tsv2Magetab
            | ConverterId::Fpkm2Magetab => "data.txt",
            _ => "txt",
        }
    }
}

impl fmt::Display for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConverterId {
    type Err = DiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        ConverterId::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| DiceError::UnknownConverter(value.to_string()))
    }
}

pub type DicedFiles = BTreeMap<String, Utf8PathBuf>;

/// A format-specific conversion routine.
///
/// Implementations write only below `output_dir` and must tolerate being
/// called again for a file they already produced.
pub trait Converter {
    fn convert(
        &self,
        record: &FileRecord,
        source: &Utf8Path,
        output_dir: &Utf8Path,
    ) -> Result<DicedFiles, DiceError>;
}

pub fn diced_file_path(output_dir: &Utf8Path, record: &FileRecord, id: ConverterId) -> Utf8PathBuf {
    output_dir.join(format!("{}.{}", record.barcode(), id.extension()))
}

#[derive(Debug, Clone, Copy)]
pub struct CopyConverter {
    id: ConverterId,
}

impl CopyConverter {
    pub fn new(id: ConverterId) -> Self {
        Self { id }
    }
}

impl Converter for CopyConverter {
    fn convert(
        &self,
        record: &FileRecord,
        source: &Utf8Path,
        output_dir: &Utf8Path,
    ) -> Result<DicedFiles, DiceError> {
        let target = diced_file_path(output_dir, record, self.id);
        Store::copy_file_atomic(source, &target)?;
        Ok(DicedFiles::from([(record.case_id().to_string(), target)]))
    }
}

pub struct ConverterRegistry {
    converters: HashMap<ConverterId, Box<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for id in ConverterId::ALL.into_iter().filter(|id| !id.is_gzipped()) {
            registry.register(id, CopyConverter::new(id));
        }
        registry
    }

    /// Installs `converter` for `id`. Registering an `Unzip*` identifier
    /// installs it for the plain counterpart.
    pub fn register(&mut self, id: ConverterId, converter: impl Converter + 'static) -> &mut Self {
        self.converters.insert(id.base(), Box::new(converter));
        self
    }

    pub fn convert(
        &self,
        id: ConverterId,
        record: &FileRecord,
        source: &Utf8Path,
        output_dir: &Utf8Path,
    ) -> Result<DicedFiles, DiceError> {
        let converter = self
            .converters
            .get(&id.base())
            .ok_or_else(|| DiceError::UnknownConverter(id.to_string()))?;
        if id.is_gzipped() {
            convert_gzipped(converter.as_ref(), record, source, output_dir)
        } else {
            converter.convert(record, source, output_dir)
        }
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn convert_gzipped(
    converter: &dyn Converter,
    record: &FileRecord,
    source: &Utf8Path,
    output_dir: &Utf8Path,
) -> Result<DicedFiles, DiceError> {
    let file_name = source.file_name().unwrap_or_default();
    let Some(plain_name) = file_name.strip_suffix(".gz") else {
        return Err(DiceError::Conversion {
            file: source.to_string(),
            message: format!("unexpected gzip filename: {file_name}"),
        });
    };

    // Dropping the temp dir removes the extracted copy on every exit path.
    let temp_dir = tempfile::Builder::new()
        .prefix("gdc-dice-gunzip")
        .tempdir()
        .map_err(|err| DiceError::Filesystem(err.to_string()))?;
    let extracted = fs_util::utf8_path(temp_dir.path().join(plain_name))?;
    fs_util::gunzip(source, &extracted)?;
    tracing::debug!("extracted {source} to {extracted}");

    converter.convert(record, &extracted, output_dir)
}
