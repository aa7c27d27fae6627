use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use camino::Utf8Path;
use indexmap::IndexMap;

use crate::coverage::CoverageIndex;
use crate::domain::{REPORT_DATA_TYPES, ReportType};
use crate::error::DiceError;
use crate::store::Store;

pub fn sample_counts(index: &CoverageIndex) -> IndexMap<String, HashMap<ReportType, usize>> {
    let mut counts: IndexMap<String, HashMap<ReportType, usize>> = IndexMap::new();
    for (_, samples) in index.iter() {
        for (code, report_types) in samples {
            let row = counts.entry(code.clone()).or_default();
            for report_type in report_types {
                *row.entry(report_type.clone()).or_default() += 1;
            }
        }
    }
    counts
}

/// Writes the counts table followed by a `Totals` row that repeats the
/// counts of `primary_code`.
pub fn write_counts<W: Write>(
    index: &CoverageIndex,
    primary_code: &str,
    out: W,
) -> Result<(), DiceError> {
    let counts = sample_counts(index);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(out);
    let csv_err = |err: csv::Error| DiceError::Filesystem(format!("write counts: {err}"));

    let header = std::iter::once("Sample Type").chain(REPORT_DATA_TYPES.iter().map(ReportType::label));
    writer.write_record(header).map_err(csv_err)?;

    let row_for = |label: &str, row: Option<&HashMap<ReportType, usize>>| {
        let mut record = vec![label.to_string()];
        record.extend(REPORT_DATA_TYPES.iter().map(|report_type| {
            row.and_then(|row| row.get(report_type))
                .copied()
                .unwrap_or(0)
                .to_string()
        }));
        record
    };

    for (code, row) in &counts {
        writer.write_record(row_for(code, Some(row))).map_err(csv_err)?;
    }
    writer
        .write_record(row_for("Totals", counts.get(primary_code)))
        .map_err(csv_err)?;
    writer
        .flush()
        .map_err(|err| DiceError::Filesystem(format!("write counts: {err}")))?;
    Ok(())
}

pub fn write_counts_file(
    index: &CoverageIndex,
    primary_code: &str,
    path: &Utf8Path,
) -> Result<(), DiceError> {
    let mut buffer = Vec::new();
    write_counts(index, primary_code, &mut buffer)?;
    Store::write_bytes_atomic(path, &buffer)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapMatrix {
    pub rownames: Vec<ReportType>,
    pub case_ids: Vec<String>,
    pub cells: Vec<Vec<u8>>,
}

impl HeatmapMatrix {
    pub fn from_coverage(index: &CoverageIndex) -> Self {
        let mut per_case: Vec<(String, BTreeSet<&ReportType>)> = index
            .iter()
            .map(|(case, samples)| (case.to_string(), samples.values().flatten().collect()))
            .collect();
        per_case.sort_by(|a, b| a.0.cmp(&b.0));

        let rownames = REPORT_DATA_TYPES.to_vec();
        let cells = rownames
            .iter()
            .map(|report_type| {
                per_case
                    .iter()
                    .map(|(_, present)| u8::from(present.contains(report_type)))
                    .collect()
            })
            .collect();

        Self {
            rownames,
            case_ids: per_case.into_iter().map(|(case, _)| case).collect(),
            cells,
        }
    }

    pub fn write_tsv<W: Write>(&self, out: W) -> Result<(), DiceError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(out);
        let csv_err = |err: csv::Error| DiceError::Filesystem(format!("write heatmap: {err}"));

        let header = std::iter::once("Data Type").chain(self.case_ids.iter().map(String::as_str));
        writer.write_record(header).map_err(csv_err)?;
        for (report_type, row) in self.rownames.iter().zip(&self.cells) {
            let record = std::iter::once(report_type.label().to_string())
                .chain(row.iter().map(u8::to_string));
            writer.write_record(record).map_err(csv_err)?;
        }
        writer
            .flush()
            .map_err(|err| DiceError::Filesystem(format!("write heatmap: {err}")))?;
        Ok(())
    }

    pub fn write_file(&self, path: &Utf8Path) -> Result<(), DiceError> {
        let mut buffer = Vec::new();
        self.write_tsv(&mut buffer)?;
        Store::write_bytes_atomic(path, &buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRow;

    fn row(case: &str, sample_type: &str, report_type: ReportType) -> LedgerRow {
        LedgerRow {
            case_id: case.to_string(),
            tcga_barcode: case.to_string(),
            sample_type: sample_type.to_string(),
            annotation: String::new(),
            file_name: String::new(),
            center: String::new(),
            platform: String::new(),
            report_type,
        }
    }

    #[test]
    fn heatmap_flattens_sample_types() {
        let index = CoverageIndex::from_rows(&[
            row("C2", "Primary Tumor", ReportType::Cn),
            row("C1", "Solid Tissue Normal", ReportType::Maf),
            row("C1", "", ReportType::Clinical),
        ]);
        let matrix = HeatmapMatrix::from_coverage(&index);
        assert_eq!(matrix.case_ids, vec!["C1", "C2"]);
        let cn = matrix.rownames.iter().position(|t| *t == ReportType::Cn).unwrap();
        let clinical = matrix
            .rownames
            .iter()
            .position(|t| *t == ReportType::Clinical)
            .unwrap();
        assert_eq!(matrix.cells[cn], vec![0, 1]);
        assert_eq!(matrix.cells[clinical], vec![1, 0]);

        let mut out = Vec::new();
        matrix.write_tsv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Data Type\tC1\tC2\nBCR\t0\t0\nClinical\t1\t0\n"));
    }
}
