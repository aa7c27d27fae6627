use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Read;

use camino::Utf8Path;

use crate::converter::ConverterId;
use crate::domain::{AnnotationName, FileRecord};
use crate::error::DiceError;

const BUILTIN_TABLE: &str = include_str!("../config/annotations_table.tsv");

const CLASSIFICATION_COLUMNS: [&str; 7] = [
    "data_type",
    "data_category",
    "experimental_strategy",
    "platform",
    "tags",
    "center_namespace",
    "workflow_type",
];

const ANNOTATION_COLUMNS: [&str; 2] = ["annotation", "Firehose_annotation"];
const CONVERTER_COLUMN: &str = "converter";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    pub data_type: String,
    pub data_category: String,
    pub experimental_strategy: String,
    pub platform: String,
    pub tags: BTreeSet<String>,
    pub center_namespace: String,
    pub workflow_type: String,
}

impl Fingerprint {
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            data_type: record.data_type.clone(),
            data_category: record.data_category.clone(),
            experimental_strategy: record.experimental_strategy.clone(),
            platform: record.platform.clone(),
            tags: normalize_tags(record.tags.iter().map(String::as_str)),
            center_namespace: record.center_namespace().to_string(),
            workflow_type: record.workflow_type().to_string(),
        }
    }
}

fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    tags.into_iter()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    pub annotation: String,
    pub converter: ConverterId,
}

#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: HashMap<Fingerprint, TranslationEntry>,
}

impl TranslationTable {
    pub fn load(path: &Utf8Path) -> Result<Self, DiceError> {
        let file = fs::File::open(path.as_std_path())
            .map_err(|_| DiceError::TranslationTableRead(path.as_std_path().to_path_buf()))?;
        tracing::debug!("loading translation table {path}");
        Self::from_reader(file)
    }

    pub fn builtin() -> Result<Self, DiceError> {
        Self::from_reader(BUILTIN_TABLE.as_bytes())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DiceError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|err| DiceError::TranslationTableParse(err.to_string()))?
            .clone();
        let column = |name: &str| headers.iter().position(|header| header.trim() == name);
        let classification = CLASSIFICATION_COLUMNS
            .iter()
            .map(|name| {
                column(*name).ok_or_else(|| {
                    DiceError::TranslationTableParse(format!("missing column {name}"))
                })
            })
            .collect::<Result<Vec<_>, DiceError>>()?;
        let annotation_idx = ANNOTATION_COLUMNS
            .iter()
            .find_map(|name| column(*name))
            .ok_or_else(|| DiceError::TranslationTableParse("missing column annotation".to_string()))?;
        let converter_idx = column(CONVERTER_COLUMN).ok_or_else(|| {
            DiceError::TranslationTableParse(format!("missing column {CONVERTER_COLUMN}"))
        })?;

        let mut entries: HashMap<Fingerprint, TranslationEntry> = HashMap::new();
        let mut duplicates = Vec::new();
        for (row_no, row) in reader.records().enumerate() {
            let row = row.map_err(|err| DiceError::TranslationTableParse(err.to_string()))?;
            let line = row_no + 2;
            let field = |idx: usize| row.get(idx).unwrap_or("").trim().to_string();

            let annotation = field(annotation_idx);
            if annotation.is_empty() {
                return Err(DiceError::TranslationTableParse(format!(
                    "line {line}: empty annotation"
                )));
            }
            let converter: ConverterId = field(converter_idx).parse().map_err(|err| {
                DiceError::TranslationTableParse(format!("line {line}: {err}"))
            })?;

            let fingerprint = Fingerprint {
                data_type: field(classification[0]),
                data_category: field(classification[1]),
                experimental_strategy: field(classification[2]),
                platform: field(classification[3]),
                tags: normalize_tags(row.get(classification[4]).unwrap_or("").split(',')),
                center_namespace: field(classification[5]),
                workflow_type: field(classification[6]),
            };

            if let Some(existing) = entries.get(&fingerprint) {
                duplicates.push(format!(
                    "line {line}: {annotation} ({converter}) shadowed by {} ({})",
                    existing.annotation, existing.converter
                ));
                continue;
            }
            entries.insert(
                fingerprint,
                TranslationEntry {
                    annotation,
                    converter,
                },
            );
        }

        if !duplicates.is_empty() {
            tracing::warn!(
                "ignored {} duplicate annotation definitions, first row kept: {}",
                duplicates.len(),
                duplicates.join("; ")
            );
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&TranslationEntry> {
        self.entries.get(fingerprint)
    }

    pub fn resolve(&self, record: &FileRecord) -> (AnnotationName, Option<ConverterId>) {
        match self.lookup(&Fingerprint::from_record(record)) {
            Some(entry) => (
                AnnotationName::Known(entry.annotation.clone()),
                Some(entry.converter),
            ),
            None => (AnnotationName::Unrecognized, None),
        }
    }
}
