use std::io::Write;

use camino::Utf8Path;
use serde::Serialize;

use crate::aggregate::{AggregateCoverage, AggregateMap, aggregate_metadata};
use crate::config::RunConfig;
use crate::converter::{ConverterRegistry, diced_file_path};
use crate::coverage::CoverageIndex;
use crate::domain::{FileRecord, primary_sample_code};
use crate::error::DiceError;
use crate::index::CaseAnnotationIndex;
use crate::ledger::{LedgerRow, LedgerWriter, PendingLedger};
use crate::lock::RootLock;
use crate::reports::{HeatmapMatrix, write_counts_file};
use crate::store::{Store, counts_path, heatmap_path, ledger_path, mirror_file_path};
use crate::translation::TranslationTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceOutcome {
    MissingSource,
    Unrecognized,
    DryRun,
    AlreadyDiced,
    Diced,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiceSummary {
    pub timestamp: String,
    pub programs: Vec<ProgramSummary>,
}

impl DiceSummary {
    pub fn failed_programs(&self) -> Vec<&str> {
        self.programs
            .iter()
            .filter(|program| program.error.is_some())
            .map(|program| program.program.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgramSummary {
    pub program: String,
    pub projects: Vec<ProjectSummary>,
    pub skipped_projects: Vec<String>,
    pub aggregates: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectSummary {
    pub project: String,
    pub snapshot: String,
    pub candidates: usize,
    pub diced: usize,
    pub already_diced: usize,
    pub unrecognized: usize,
    pub missing_source: usize,
    pub dry_run: usize,
    pub ledger: Option<String>,
}

impl ProjectSummary {
    fn record(&mut self, outcome: DiceOutcome) {
        match outcome {
            DiceOutcome::MissingSource => self.missing_source += 1,
            DiceOutcome::Unrecognized => self.unrecognized += 1,
            DiceOutcome::DryRun => self.dry_run += 1,
            DiceOutcome::AlreadyDiced => self.already_diced += 1,
            DiceOutcome::Diced => self.diced += 1,
        }
    }

    pub fn ledger_rows(&self) -> usize {
        self.diced + self.already_diced
    }
}

pub struct ProjectResult {
    pub summary: ProjectSummary,
    pub coverage: Option<CoverageIndex>,
}

pub struct Dicer {
    config: RunConfig,
    store: Store,
    table: TranslationTable,
    registry: ConverterRegistry,
    aggregates: AggregateMap,
}

impl Dicer {
    pub fn new(config: RunConfig, table: TranslationTable, registry: ConverterRegistry) -> Self {
        let store = Store::new(config.mirror_root.clone(), config.dice_root.clone());
        let aggregates = AggregateMap::from_config(&config.aggregates);
        Self {
            config,
            store,
            table,
            registry,
            aggregates,
        }
    }

    pub fn run(&self) -> DiceSummary {
        let mut summary = DiceSummary {
            timestamp: self.config.timestamp.clone(),
            programs: Vec::new(),
        };
        for program in &self.config.programs {
            let mut program_summary = ProgramSummary {
                program: program.clone(),
                ..ProgramSummary::default()
            };
            if let Err(err) = self.dice_program(program, &mut program_summary) {
                tracing::error!("dicing {program} failed: {err}");
                program_summary.error = Some(err.to_string());
            }
            summary.programs.push(program_summary);
        }
        summary
    }

    pub fn dice_program(
        &self,
        program: &str,
        summary: &mut ProgramSummary,
    ) -> Result<(), DiceError> {
        let dice_root = self.store.dice_program_root(program);
        let mirror_root = self.store.mirror_program_root(program);

        let _dice_lock = self.lock(&dice_root, "dice")?;
        let _mirror_lock = self.lock(&mirror_root, "mirror")?;

        let mut projects = self.config.projects.clone();
        projects.sort();

        let mut aggregate_coverage = AggregateCoverage::default();
        for project in &projects {
            match self.dice_project(program, project)? {
                Some(result) => {
                    if let Some(coverage) = &result.coverage {
                        aggregate_coverage.add_project(&self.aggregates, project, coverage);
                    }
                    summary.projects.push(result.summary);
                }
                None => summary.skipped_projects.push(project.clone()),
            }
        }

        if self.config.dry_run || self.aggregates.is_empty() {
            return Ok(());
        }

        aggregate_metadata(&dice_root, &self.config.timestamp, &self.aggregates)?;
        for (aggregate, coverage) in aggregate_coverage.iter() {
            tracing::info!("generating aggregate counts for {aggregate}");
            self.write_reports(&dice_root, aggregate, coverage)?;
            summary.aggregates.push(aggregate.to_string());
        }
        Ok(())
    }

    fn lock(&self, root: &Utf8Path, role: &str) -> Result<Option<RootLock>, DiceError> {
        // Dry runs create nothing, lock files included.
        if self.config.dry_run {
            return RootLock::acquire_existing(root, role);
        }
        RootLock::acquire(root, role).map(Some)
    }

    pub fn dice_project(
        &self,
        program: &str,
        project: &str,
    ) -> Result<Option<ProjectResult>, DiceError> {
        let timestamp = &self.config.timestamp;
        let Some(snapshot) = self.store.latest_snapshot(program, project, timestamp)? else {
            tracing::warn!("No metadata found for {project} earlier than {timestamp}");
            return Ok(None);
        };

        let records = Store::load_snapshot(&snapshot)?;
        let mirror_project_root = self.store.mirror_project_root(program, project);
        let dice_project_root = self.store.dice_project_root(program, project);
        tracing::info!("Dicing {project} to {dice_project_root}");

        // The snapshot lists files; dicing wants one file per case and
        // annotation, so dedupe before converting anything.
        let index = CaseAnnotationIndex::build(&records, &self.table);
        let mut summary = ProjectSummary {
            project: project.to_string(),
            snapshot: snapshot.file_name().unwrap_or_default().to_string(),
            candidates: index.len(),
            ..ProjectSummary::default()
        };

        if self.config.dry_run {
            for (_, _, record) in index.iter() {
                let outcome = self.dice_one::<std::io::Sink>(
                    record,
                    &mirror_project_root,
                    &dice_project_root,
                    None,
                )?;
                summary.record(outcome);
            }
            return Ok(Some(ProjectResult {
                summary,
                coverage: None,
            }));
        }

        let program_root = self.store.dice_program_root(program);
        let ledger = ledger_path(&program_root, project, timestamp);
        // A failure before commit leaves the previous ledger in place.
        let mut pending = PendingLedger::create(&ledger)?;
        for (_, _, record) in index.iter() {
            let outcome = self.dice_one(
                record,
                &mirror_project_root,
                &dice_project_root,
                Some(pending.writer()),
            )?;
            summary.record(outcome);
        }
        pending.commit()?;
        summary.ledger = Some(ledger.to_string());

        tracing::info!("generating counts for {project}");
        let coverage = CoverageIndex::from_ledger(&ledger)?;
        self.write_reports(&program_root, project, &coverage)?;

        Ok(Some(ProjectResult {
            summary,
            coverage: Some(coverage),
        }))
    }

    fn write_reports(
        &self,
        program_root: &Utf8Path,
        cohort: &str,
        coverage: &CoverageIndex,
    ) -> Result<(), DiceError> {
        let timestamp = &self.config.timestamp;
        write_counts_file(
            coverage,
            primary_sample_code(cohort),
            &counts_path(program_root, cohort, timestamp),
        )?;
        HeatmapMatrix::from_coverage(coverage).write_file(&heatmap_path(program_root, cohort, timestamp))
    }

    pub fn dice_one<W: Write>(
        &self,
        record: &FileRecord,
        mirror_project_root: &Utf8Path,
        dice_project_root: &Utf8Path,
        ledger: Option<&mut LedgerWriter<W>>,
    ) -> Result<DiceOutcome, DiceError> {
        let mirror_path = mirror_file_path(mirror_project_root, record);
        if !mirror_path.as_std_path().is_file() {
            tracing::debug!("{mirror_path} not mirrored, skipping");
            return Ok(DiceOutcome::MissingSource);
        }

        let (annotation, converter) = self.table.resolve(record);
        let Some(converter) = converter else {
            let pretty = serde_json::to_string_pretty(record).unwrap_or_else(|_| format!("{record:?}"));
            tracing::warn!("Unrecognized data:\n{pretty}");
            return Ok(DiceOutcome::Unrecognized);
        };

        let dice_path = dice_project_root.join(annotation.as_str());
        let expected_path = diced_file_path(&dice_path, record, converter);
        tracing::info!("Dicing file {mirror_path} to {expected_path}");

        let ledger = match ledger {
            Some(ledger) if !self.config.dry_run => ledger,
            _ => return Ok(DiceOutcome::DryRun),
        };

        let outcome = if !self.config.force && expected_path.as_std_path().is_file() {
            tracing::debug!("{expected_path} already diced");
            DiceOutcome::AlreadyDiced
        } else {
            self.registry
                .convert(converter, record, &mirror_path, &dice_path)?;
            DiceOutcome::Diced
        };

        ledger.append(&LedgerRow::new(record, &annotation, &expected_path))?;
        Ok(outcome)
    }
}
