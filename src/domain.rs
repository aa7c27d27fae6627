use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub file_id: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub file_name: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub data_type: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub data_category: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub experimental_strategy: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub platform: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub center: Option<Center>,
    #[serde(default)]
    pub analysis: Option<Analysis>,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub cases: Vec<CaseEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Center {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub namespace: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub short_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub workflow_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseEntry {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub submitter_id: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub samples: Vec<SampleEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleEntry {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub submitter_id: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub sample_type: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub portions: Vec<PortionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortionEntry {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub analytes: Vec<AnalyteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyteEntry {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub aliquots: Vec<AliquotEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliquotEntry {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub submitter_id: String,
}

fn empty_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FileRecord {
    fn first_case(&self) -> Option<&CaseEntry> {
        self.cases.first()
    }

    fn first_sample(&self) -> Option<&SampleEntry> {
        self.first_case().and_then(|case| case.samples.first())
    }

    fn first_aliquot(&self) -> Option<&AliquotEntry> {
        self.first_sample()
            .and_then(|sample| sample.portions.first())
            .and_then(|portion| portion.analytes.first())
            .and_then(|analyte| analyte.aliquots.first())
    }

    pub fn case_id(&self) -> &str {
        self.first_case()
            .map(|case| case.submitter_id.as_str())
            .unwrap_or("")
    }

    pub fn has_sample(&self) -> bool {
        self.first_sample().is_some()
    }

    pub fn barcode(&self) -> &str {
        if let Some(aliquot) = self.first_aliquot().filter(|a| !a.submitter_id.is_empty()) {
            return &aliquot.submitter_id;
        }
        if let Some(sample) = self.first_sample().filter(|s| !s.submitter_id.is_empty()) {
            return &sample.submitter_id;
        }
        self.case_id()
    }

    pub fn sample_type(&self) -> Option<&str> {
        self.first_sample()
            .map(|sample| sample.sample_type.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn center(&self) -> &str {
        self.center
            .as_ref()
            .map(|center| center.short_name.as_str())
            .unwrap_or("")
    }

    pub fn center_namespace(&self) -> &str {
        self.center
            .as_ref()
            .map(|center| center.namespace.as_str())
            .unwrap_or("")
    }

    pub fn workflow_type(&self) -> &str {
        self.analysis
            .as_ref()
            .map(|analysis| analysis.workflow_type.as_str())
            .unwrap_or("")
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationName {
    Known(String),
    Unrecognized,
}

impl AnnotationName {
    pub const UNRECOGNIZED: &'static str = "UNRECOGNIZED";

    pub fn as_str(&self) -> &str {
        match self {
            AnnotationName::Known(name) => name,
            AnnotationName::Unrecognized => Self::UNRECOGNIZED,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, AnnotationName::Known(_))
    }

    pub fn report_type(&self) -> ReportType {
        ReportType::for_annotation(self.as_str())
    }
}

impl fmt::Display for AnnotationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ReportType {
    Bcr,
    Clinical,
    Cn,
    LowP,
    Methylation,
    Mrna,
    MrnaSeq,
    Mir,
    MirSeq,
    Rppa,
    Maf,
    RawMaf,
    Other(String),
}

pub static REPORT_DATA_TYPES: [ReportType; 12] = [
    ReportType::Bcr,
    ReportType::Clinical,
    ReportType::Cn,
    ReportType::LowP,
    ReportType::Methylation,
    ReportType::Mrna,
    ReportType::MrnaSeq,
    ReportType::Mir,
    ReportType::MirSeq,
    ReportType::Rppa,
    ReportType::Maf,
    ReportType::RawMaf,
];

const ANNOTATION_REPORT_TYPES: &[(&str, ReportType)] = &[
    ("clinical__primary", ReportType::Clinical),
    ("clinical__biospecimen", ReportType::Bcr),
    ("CNV__snp6", ReportType::Cn),
    ("CNV__unfiltered__snp6", ReportType::Cn),
    ("CNV__lowpass", ReportType::LowP),
    ("methylation__HM27", ReportType::Methylation),
    ("methylation__HM450", ReportType::Methylation),
    ("mRNA__microarray", ReportType::Mrna),
    ("mRNA__geneExp__FPKM", ReportType::MrnaSeq),
    ("mRNA__geneExpNormed__FPKM", ReportType::MrnaSeq),
    ("mRNA__counts__FPKM", ReportType::MrnaSeq),
    ("miR__geneExp", ReportType::MirSeq),
    ("miR__isoformExp", ReportType::MirSeq),
    ("protein__RPPA", ReportType::Rppa),
    ("SNV__mutect", ReportType::Maf),
    ("SNV__muse", ReportType::Maf),
    ("SNV__varscan", ReportType::Maf),
    ("SNV__somaticsniper", ReportType::Maf),
    ("SNV__mutect__raw", ReportType::RawMaf),
];

impl ReportType {
    pub fn for_annotation(annotation: &str) -> Self {
        ANNOTATION_REPORT_TYPES
            .iter()
            .find(|(name, _)| *name == annotation)
            .map(|(_, report_type)| report_type.clone())
            .unwrap_or_else(|| ReportType::Other(annotation.to_string()))
    }

    pub fn from_label(label: &str) -> Self {
        REPORT_DATA_TYPES
            .iter()
            .find(|known| known.label() == label)
            .cloned()
            .unwrap_or_else(|| ReportType::Other(label.to_string()))
    }

    pub fn label(&self) -> &str {
        match self {
            ReportType::Bcr => "BCR",
            ReportType::Clinical => "Clinical",
            ReportType::Cn => "CN",
            ReportType::LowP => "LowP",
            ReportType::Methylation => "Methylation",
            ReportType::Mrna => "mRNA",
            ReportType::MrnaSeq => "mRNASeq",
            ReportType::Mir => "miR",
            ReportType::MirSeq => "miRSeq",
            ReportType::Rppa => "RPPA",
            ReportType::Maf => "MAF",
            ReportType::RawMaf => "rawMAF",
            ReportType::Other(label) => label,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<ReportType> for String {
    fn from(value: ReportType) -> Self {
        value.label().to_string()
    }
}

impl From<String> for ReportType {
    fn from(value: String) -> Self {
        ReportType::from_label(&value)
    }
}

// (long name, numeric code, short code)
const SAMPLE_TYPES: &[(&str, &str, &str)] = &[
    ("Primary Tumor", "01", "TP"),
    ("Recurrent Tumor", "02", "TR"),
    ("Primary Blood Derived Cancer - Peripheral Blood", "03", "TB"),
    ("Recurrent Blood Derived Cancer - Bone Marrow", "04", "TRBM"),
    ("Additional - New Primary", "05", "TAP"),
    ("Metastatic", "06", "TM"),
    ("Additional Metastatic", "07", "TAM"),
    ("Human Tumor Original Cells", "08", "THOC"),
    ("Primary Blood Derived Cancer - Bone Marrow", "09", "TBM"),
    ("Blood Derived Normal", "10", "NB"),
    ("Solid Tissue Normal", "11", "NT"),
    ("Buccal Cell Normal", "12", "NBC"),
    ("EBV Immortalized Normal", "13", "NEBV"),
    ("Bone Marrow Normal", "14", "NBM"),
    ("Control Analyte", "20", "CELLC"),
    ("Recurrent Blood Derived Cancer - Peripheral Blood", "40", "TRB"),
    ("Cell Lines", "50", "CELL"),
    ("Primary Xenograft Tissue", "60", "XP"),
    ("Cell Line Derived Xenograft Tissue", "61", "XCL"),
];

static BARCODE_SAMPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+-[A-Z0-9]{2}-[A-Z0-9]{4}-(\d{2})").unwrap());

pub fn sample_type_code(sample_type: &str) -> Option<&'static str> {
    SAMPLE_TYPES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(sample_type.trim()))
        .map(|(_, _, code)| *code)
}

pub fn sample_type_code_from_barcode(barcode: &str) -> Option<&'static str> {
    let numeric = BARCODE_SAMPLE.captures(barcode)?.get(1)?.as_str();
    SAMPLE_TYPES
        .iter()
        .find(|(_, number, _)| *number == numeric)
        .map(|(_, _, code)| *code)
}

pub fn resolve_sample_code(sample_type: &str, barcode: &str) -> Option<&'static str> {
    sample_type_code(sample_type).or_else(|| sample_type_code_from_barcode(barcode))
}

pub fn primary_sample_code(cohort: &str) -> &'static str {
    if cohort.ends_with("LAML") {
        "TB"
    } else if cohort.ends_with("SKCM") {
        "TM"
    } else {
        "TP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FileRecord {
        serde_json::from_value(serde_json::json!({
            "file_id": "f1",
            "file_name": "a.seg.txt",
            "data_type": "Copy Number Segment",
            "platform": null,
            "center": {"namespace": "broad.mit.edu", "short_name": "BI"},
            "cases": [{
                "submitter_id": "TCGA-AB-1234",
                "samples": [{
                    "submitter_id": "TCGA-AB-1234-01A",
                    "sample_type": "Primary Tumor",
                    "portions": [{"analytes": [{"aliquots": [
                        {"submitter_id": "TCGA-AB-1234-01A-11D-A123-01"}
                    ]}]}]
                }]
            }],
            "state": "live"
        }))
        .unwrap()
    }

    #[test]
    fn record_accessors() {
        let record = record();
        assert_eq!(record.case_id(), "TCGA-AB-1234");
        assert_eq!(record.barcode(), "TCGA-AB-1234-01A-11D-A123-01");
        assert_eq!(record.sample_type(), Some("Primary Tumor"));
        assert_eq!(record.center(), "BI");
        assert_eq!(record.center_namespace(), "broad.mit.edu");
        assert_eq!(record.platform(), "");
        assert_eq!(record.workflow_type(), "");
        assert!(record.extra.contains_key("state"));
    }

    #[test]
    fn case_level_record_uses_case_barcode() {
        let record: FileRecord = serde_json::from_value(serde_json::json!({
            "cases": [{"submitter_id": "TCGA-AB-1234"}]
        }))
        .unwrap();
        assert!(!record.has_sample());
        assert_eq!(record.barcode(), "TCGA-AB-1234");
        assert_eq!(record.sample_type(), None);
    }

    #[test]
    fn sample_codes() {
        assert_eq!(sample_type_code("Primary Tumor"), Some("TP"));
        assert_eq!(sample_type_code("Solid Tissue Normal"), Some("NT"));
        assert_eq!(sample_type_code("nonsense"), None);
        assert_eq!(sample_type_code_from_barcode("TCGA-AB-1234-11A"), Some("NT"));
        assert_eq!(resolve_sample_code("", "TCGA-AB-1234-06A"), Some("TM"));
        assert_eq!(resolve_sample_code("", "TCGA-AB-1234"), None);
    }

    #[test]
    fn report_types_round_trip_through_labels() {
        assert_eq!(ReportType::for_annotation("clinical__biospecimen"), ReportType::Bcr);
        assert_eq!(ReportType::from_label("mRNASeq"), ReportType::MrnaSeq);
        assert_eq!(
            ReportType::for_annotation("RNAseq"),
            ReportType::Other("RNAseq".to_string())
        );
    }

    #[test]
    fn primary_codes() {
        assert_eq!(primary_sample_code("TCGA-LAML"), "TB");
        assert_eq!(primary_sample_code("TCGA-SKCM"), "TM");
        assert_eq!(primary_sample_code("TCGA-ACC"), "TP");
    }
}
