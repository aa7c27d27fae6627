use gdc_dice::coverage::CoverageIndex;
use gdc_dice::domain::ReportType;
use gdc_dice::ledger::{LedgerRow, LedgerWriter};
use gdc_dice::reports::{sample_counts, write_counts};
use tracing_test::traced_test;

fn row(case: &str, barcode: &str, sample_type: &str, report_type: ReportType) -> LedgerRow {
    LedgerRow {
        case_id: case.to_string(),
        tcga_barcode: barcode.to_string(),
        sample_type: sample_type.to_string(),
        annotation: report_type.label().to_string(),
        file_name: format!("/diced/{barcode}.txt"),
        center: "BI".to_string(),
        platform: String::new(),
        report_type,
    }
}

fn ledger_bytes(rows: &[LedgerRow]) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut writer = LedgerWriter::from_writer(&mut buffer).unwrap();
    for row in rows {
        writer.append(row).unwrap();
    }
    writer.finish().unwrap();
    buffer
}

#[test]
fn case_level_types_reach_every_sample_bucket() {
    let rows = vec![
        row("C1", "C1", "", ReportType::Clinical),
        row("C1", "C1", "", ReportType::Bcr),
        row("C1", "TCGA-AB-0001-01A", "Primary Tumor", ReportType::Maf),
        row("C1", "TCGA-AB-0001-11A", "Solid Tissue Normal", ReportType::Cn),
        row("C2", "TCGA-AB-0002-01A", "Primary Tumor", ReportType::Maf),
    ];
    let index = CoverageIndex::from_reader(ledger_bytes(&rows).as_slice()).unwrap();

    let tumor = index.report_types("C1", "TP").unwrap();
    assert!(tumor.contains(&ReportType::Maf));
    assert!(tumor.contains(&ReportType::Clinical));
    assert!(tumor.contains(&ReportType::Bcr));
    let normal = index.report_types("C1", "NT").unwrap();
    assert!(normal.contains(&ReportType::Cn));
    assert!(normal.contains(&ReportType::Clinical));
    assert!(normal.contains(&ReportType::Bcr));

    let other = index.report_types("C2", "TP").unwrap();
    assert!(!other.contains(&ReportType::Clinical));
    assert!(!other.contains(&ReportType::Bcr));
}

#[test]
fn clinical_only_case_has_no_bucket() {
    let rows = vec![row("C1", "C1", "", ReportType::Clinical)];
    let index = CoverageIndex::from_rows(&rows);
    assert!(index.case("C1").is_none());
}

#[traced_test]
#[test]
fn row_without_sample_code_is_skipped() {
    let rows = vec![row("C1", "not-a-barcode", "", ReportType::Cn)];
    let index = CoverageIndex::from_rows(&rows);
    assert!(index.is_empty());
    assert!(logs_contain("no sample type for not-a-barcode"));
}

#[test]
fn counts_end_with_primary_totals() {
    let rows = vec![
        row("C1", "C1", "", ReportType::Clinical),
        row("C1", "TCGA-AB-0001-01A", "Primary Tumor", ReportType::Maf),
        row("C2", "TCGA-AB-0002-01A", "Primary Tumor", ReportType::Maf),
        row("C2", "TCGA-AB-0002-11A", "Solid Tissue Normal", ReportType::Cn),
    ];
    let index = CoverageIndex::from_rows(&rows);

    let counts = sample_counts(&index);
    assert_eq!(counts["TP"][&ReportType::Maf], 2);
    assert_eq!(counts["TP"][&ReportType::Clinical], 1);

    let mut out = Vec::new();
    write_counts(&index, "TP", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "Sample Type\tBCR\tClinical\tCN\tLowP\tMethylation\tmRNA\tmRNASeq\tmiR\tmiRSeq\tRPPA\tMAF\trawMAF"
    );
    assert_eq!(lines[1], "TP\t0\t1\t0\t0\t0\t0\t0\t0\t0\t0\t2\t0");
    assert_eq!(lines[2], "NT\t0\t0\t1\t0\t0\t0\t0\t0\t0\t0\t0\t0");
    assert_eq!(lines[3], "Totals\t0\t1\t0\t0\t0\t0\t0\t0\t0\t0\t2\t0");
    assert_eq!(lines.len(), 4);
}

#[test]
fn totals_are_zero_without_primary_samples() {
    let rows = vec![row("C1", "TCGA-AB-0001-11A", "Solid Tissue Normal", ReportType::Cn)];
    let index = CoverageIndex::from_rows(&rows);

    let mut out = Vec::new();
    write_counts(&index, "TB", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.ends_with("Totals\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\n"));
}
