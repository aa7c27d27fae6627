use indexmap::IndexMap;

use crate::domain::{AnnotationName, FileRecord};
use crate::translation::TranslationTable;

/// One file per (barcode, annotation).
///
/// When several files share a key the last one seen wins. There is no
/// quality or recency tie-break.
#[derive(Debug, Clone, Default)]
pub struct CaseAnnotationIndex {
    entries: IndexMap<(String, AnnotationName), FileRecord>,
}

impl CaseAnnotationIndex {
    pub fn build<'a>(
        records: impl IntoIterator<Item = &'a FileRecord>,
        table: &TranslationTable,
    ) -> Self {
        let mut entries = IndexMap::new();
        for record in records {
            let (annotation, _) = table.resolve(record);
            let key = (record.barcode().to_string(), annotation);
            if let Some(previous) = entries.insert(key, record.clone()) {
                tracing::debug!(
                    "{} replaces {} for {}",
                    record.file_id,
                    previous.file_id,
                    record.barcode()
                );
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, barcode: &str, annotation: &AnnotationName) -> Option<&FileRecord> {
        self.entries
            .get(&(barcode.to_string(), annotation.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationName, &FileRecord)> {
        self.entries
            .iter()
            .map(|((barcode, annotation), record)| (barcode.as_str(), annotation, record))
    }
}
