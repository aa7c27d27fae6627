use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::coverage::CoverageIndex;
use crate::error::DiceError;
use crate::store::{Store, ledger_path};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateMap {
    members: BTreeMap<String, Vec<String>>,
    by_cohort: BTreeMap<String, Vec<String>>,
}

impl AggregateMap {
    pub fn from_config(aggregates: &BTreeMap<String, String>) -> Self {
        let mut members = BTreeMap::new();
        let mut by_cohort: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (aggregate, cohorts) in aggregates {
            let mut cohorts: Vec<String> = cohorts
                .split(',')
                .map(str::trim)
                .filter(|cohort| !cohort.is_empty())
                .map(str::to_string)
                .collect();
            cohorts.sort();
            cohorts.dedup();
            for cohort in &cohorts {
                by_cohort
                    .entry(cohort.clone())
                    .or_default()
                    .push(aggregate.clone());
            }
            members.insert(aggregate.clone(), cohorts);
        }
        Self { members, by_cohort }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn aggregates_for(&self, cohort: &str) -> &[String] {
        self.by_cohort.get(cohort).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.members
            .iter()
            .map(|(aggregate, cohorts)| (aggregate.as_str(), cohorts.as_slice()))
    }
}

pub fn aggregate_metadata(
    program_root: &Utf8Path,
    timestamp: &str,
    aggregates: &AggregateMap,
) -> Result<Vec<Utf8PathBuf>, DiceError> {
    let mut written = Vec::new();
    for (aggregate, cohorts) in aggregates.iter() {
        let mut content = Vec::new();
        let mut present = 0;
        for cohort in cohorts {
            let member = ledger_path(program_root, cohort, timestamp);
            if !member.as_std_path().is_file() {
                tracing::warn!("no diced metadata for {cohort} in aggregate {aggregate}");
                continue;
            }
            append_ledger(&member, present > 0, &mut content)?;
            present += 1;
        }
        if present == 0 {
            tracing::debug!("aggregate {aggregate} has no diced members");
            continue;
        }

        let path = ledger_path(program_root, aggregate, timestamp);
        Store::write_bytes_atomic(&path, &content)?;
        tracing::info!("wrote aggregate metadata for {aggregate} from {present} cohorts");
        written.push(path);
    }
    Ok(written)
}

fn append_ledger(path: &Utf8Path, skip_header: bool, out: &mut Vec<u8>) -> Result<(), DiceError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| DiceError::Ledger(format!("{path}: {err}")))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut first = true;
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|err| DiceError::Ledger(format!("{path}: {err}")))?;
        if read == 0 {
            break;
        }
        if !(first && skip_header) {
            out.extend_from_slice(&line);
            if !line.ends_with(b"\n") {
                out.push(b'\n');
            }
        }
        first = false;
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct AggregateCoverage {
    by_aggregate: IndexMap<String, CoverageIndex>,
}

impl AggregateCoverage {
    pub fn add_project(&mut self, aggregates: &AggregateMap, project: &str, index: &CoverageIndex) {
        for aggregate in aggregates.aggregates_for(project) {
            self.by_aggregate
                .entry(aggregate.clone())
                .or_default()
                .merge(index);
        }
    }

    pub fn get(&self, aggregate: &str) -> Option<&CoverageIndex> {
        self.by_aggregate.get(aggregate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CoverageIndex)> {
        self.by_aggregate
            .iter()
            .map(|(aggregate, index)| (aggregate.as_str(), index))
    }
}
