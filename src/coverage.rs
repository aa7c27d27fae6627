use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use indexmap::IndexMap;

use crate::domain::{ReportType, resolve_sample_code};
use crate::error::DiceError;
use crate::ledger::{LedgerRow, ledger_reader};

pub type SampleCoverage = IndexMap<String, BTreeSet<ReportType>>;

/// Case id → sample-type code → report types available.
///
/// BCR and Clinical data belong to the case, so they are present in every
/// sample-type bucket of a case that has them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageIndex {
    cases: IndexMap<String, SampleCoverage>,
}

impl CoverageIndex {
    pub fn from_ledger(path: &Utf8Path) -> Result<Self, DiceError> {
        let file = File::open(path.as_std_path())
            .map_err(|err| DiceError::Ledger(format!("{path}: {err}")))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DiceError> {
        let mut builder = CoverageBuilder::default();
        for row in ledger_reader(reader).deserialize() {
            let row: LedgerRow = row.map_err(|err| DiceError::Ledger(err.to_string()))?;
            builder.add(&row);
        }
        Ok(builder.finish())
    }

    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a LedgerRow>) -> Self {
        let mut builder = CoverageBuilder::default();
        for row in rows {
            builder.add(row);
        }
        builder.finish()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn case(&self, case_id: &str) -> Option<&SampleCoverage> {
        self.cases.get(case_id)
    }

    pub fn report_types(&self, case_id: &str, sample_code: &str) -> Option<&BTreeSet<ReportType>> {
        self.cases.get(case_id)?.get(sample_code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SampleCoverage)> {
        self.cases.iter().map(|(case, samples)| (case.as_str(), samples))
    }

    pub fn merge(&mut self, other: &CoverageIndex) {
        for (case, samples) in &other.cases {
            self.cases.insert(case.clone(), samples.clone());
        }
    }
}

#[derive(Default)]
struct CoverageBuilder {
    cases: IndexMap<String, SampleCoverage>,
    with_clinical: HashSet<String>,
    with_biospecimen: HashSet<String>,
}

impl CoverageBuilder {
    fn add(&mut self, row: &LedgerRow) {
        match row.report_type {
            ReportType::Clinical => {
                self.with_clinical.insert(row.case_id.clone());
            }
            ReportType::Bcr => {
                self.with_biospecimen.insert(row.case_id.clone());
            }
            ref report_type => {
                let Some(code) = resolve_sample_code(&row.sample_type, &row.tcga_barcode) else {
                    tracing::warn!(
                        "no sample type for {} ({}), not counted",
                        row.tcga_barcode,
                        row.annotation
                    );
                    return;
                };
                self.cases
                    .entry(row.case_id.clone())
                    .or_default()
                    .entry(code.to_string())
                    .or_default()
                    .insert(report_type.clone());
            }
        }
    }

    fn finish(mut self) -> CoverageIndex {
        for (case, samples) in self.cases.iter_mut() {
            let clinical = self.with_clinical.contains(case);
            let biospecimen = self.with_biospecimen.contains(case);
            for report_types in samples.values_mut() {
                if clinical {
                    report_types.insert(ReportType::Clinical);
                }
                if biospecimen {
                    report_types.insert(ReportType::Bcr);
                }
            }
        }
        CoverageIndex { cases: self.cases }
    }
}
