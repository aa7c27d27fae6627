use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use tracing_test::traced_test;

use gdc_dice::aggregate::{AggregateCoverage, AggregateMap, aggregate_metadata};
use gdc_dice::coverage::CoverageIndex;
use gdc_dice::domain::ReportType;
use gdc_dice::ledger::{LEDGER_HEADERS, LedgerRow, PendingLedger, read_ledger};
use gdc_dice::store::ledger_path;

fn row(case: &str, report_type: ReportType) -> LedgerRow {
    LedgerRow {
        case_id: case.to_string(),
        tcga_barcode: format!("{case}-01A"),
        sample_type: "Primary Tumor".to_string(),
        annotation: report_type.label().to_string(),
        file_name: format!("/diced/{case}.txt"),
        center: "BI".to_string(),
        platform: String::new(),
        report_type,
    }
}

fn write_member(program_root: &camino::Utf8Path, cohort: &str, cases: &[&str]) -> Vec<LedgerRow> {
    let rows: Vec<LedgerRow> = cases.iter().map(|case| row(case, ReportType::Maf)).collect();
    let mut ledger = PendingLedger::create(&ledger_path(program_root, cohort, "20200101")).unwrap();
    for row in &rows {
        ledger.writer().append(row).unwrap();
    }
    ledger.commit().unwrap();
    rows
}

fn coadread() -> AggregateMap {
    AggregateMap::from_config(&BTreeMap::from([(
        "COADREAD".to_string(),
        "TCGA-COAD,TCGA-READ".to_string(),
    )]))
}

#[test]
fn aggregate_concatenates_members_under_one_header() {
    let temp = tempfile::tempdir().unwrap();
    let program_root = Utf8PathBuf::from_path_buf(temp.path().join("TCGA")).unwrap();
    let coad = write_member(&program_root, "TCGA-COAD", &["C1", "C2"]);
    let read = write_member(&program_root, "TCGA-READ", &["R1", "R2", "R3"]);

    let written = aggregate_metadata(&program_root, "20200101", &coadread()).unwrap();
    let expected = ledger_path(&program_root, "COADREAD", "20200101");
    assert_eq!(written, vec![expected.clone()]);

    let text = std::fs::read_to_string(expected.as_std_path()).unwrap();
    let header = LEDGER_HEADERS.join("\t");
    assert_eq!(text.lines().filter(|line| *line == header).count(), 1);
    assert_eq!(text.lines().count(), 6);

    let rows = read_ledger(&expected).unwrap();
    assert_eq!(rows, [coad, read].concat());
}

#[traced_test]
#[test]
fn missing_member_is_skipped() {
    let temp = tempfile::tempdir().unwrap();
    let program_root = Utf8PathBuf::from_path_buf(temp.path().join("TCGA")).unwrap();
    write_member(&program_root, "TCGA-READ", &["R1"]);

    aggregate_metadata(&program_root, "20200101", &coadread()).unwrap();
    assert!(logs_contain("no diced metadata for TCGA-COAD"));
    let rows = read_ledger(&ledger_path(&program_root, "COADREAD", "20200101")).unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn aggregate_without_members_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let program_root = Utf8PathBuf::from_path_buf(temp.path().join("TCGA")).unwrap();

    let written = aggregate_metadata(&program_root, "20200101", &coadread()).unwrap();
    assert!(written.is_empty());
    assert!(
        !ledger_path(&program_root, "COADREAD", "20200101")
            .as_std_path()
            .exists()
    );
}

#[test]
fn aggregate_coverage_unions_projects() {
    let map = coadread();
    let coad = CoverageIndex::from_rows(&[row("TCGA-AB-0001", ReportType::Maf)]);
    let read = CoverageIndex::from_rows(&[row("TCGA-AB-0002", ReportType::Cn)]);
    let unrelated = CoverageIndex::from_rows(&[row("TCGA-AB-0003", ReportType::Cn)]);

    let mut coverage = AggregateCoverage::default();
    coverage.add_project(&map, "TCGA-COAD", &coad);
    coverage.add_project(&map, "TCGA-READ", &read);
    coverage.add_project(&map, "TCGA-ACC", &unrelated);

    let merged = coverage.get("COADREAD").unwrap();
    assert_eq!(merged.len(), 2);
    assert!(merged.case("TCGA-AB-0003").is_none());
    assert_eq!(coverage.iter().count(), 1);
}
