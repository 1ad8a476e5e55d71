//! End-to-end generation: catalog → population → simulation →
//! referential check → imperfection injection.
//!
//! Stage streams come from one RngBank seeded with `config.seed`, so a
//! Dataset is a pure function of its SimConfig.

use crate::{
    catalog::{generate_catalog, Programme},
    config::SimConfig,
    engine::{CohortEngine, SimulationOutput},
    error::{SimError, SimResult},
    event::{CohortEvent, YearSummary},
    imperfection::{ImperfectionInjector, InjectionReport, NoiseStreams},
    population::{generate_population, Student},
    records::{EnrolmentRecord, PerformanceRecord},
    rng::{RngBank, StageSlot},
};
use serde::Serialize;
use std::collections::HashSet;

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub programmes: Vec<Programme>,
    pub students: Vec<Student>,
    pub enrolments: Vec<EnrolmentRecord>,
    pub performance: Vec<PerformanceRecord>,
    pub summaries: Vec<YearSummary>,
    pub events: Vec<CohortEvent>,
    pub injection: InjectionReport,
}

pub fn generate(config: &SimConfig) -> SimResult<Dataset> {
    config.validate()?;
    log::info!(
        "pipeline: seed={} years={} programmes={} entrants/year={}",
        config.seed,
        config.academic_years.len(),
        config.n_programmes,
        config.new_entrants_per_year
    );

    let bank = RngBank::new(config.seed);

    let programmes = generate_catalog(
        config,
        &mut bank.for_stage(StageSlot::Catalog),
        &mut bank.for_stage(StageSlot::CatalogNoise),
    )?;
    let students = generate_population(
        config,
        config.total_students(),
        &mut bank.for_stage(StageSlot::Population),
        &mut bank.for_stage(StageSlot::EntryRouteMissing),
        &mut bank.for_stage(StageSlot::GenderMissing),
    )?;

    let engine = CohortEngine::new(&programmes, &students, config.simulation_params())?;
    let SimulationOutput { mut enrolments, mut performance, events, summaries } = engine.run(
        &config.academic_years,
        config.new_entrants_per_year,
        &mut bank.for_stage(StageSlot::Simulation),
    )?;

    verify_references(&programmes, &students, &enrolments, &performance)?;

    let injection = ImperfectionInjector::new(config.noise_rates()).apply(
        &mut enrolments,
        &mut performance,
        &mut NoiseStreams::from_bank(&bank),
    );

    log::info!(
        "pipeline: done, {} enrolment rows, {} performance rows",
        enrolments.len(),
        performance.len()
    );

    Ok(Dataset { programmes, students, enrolments, performance, summaries, events, injection })
}

/// Every record must point at a known student, and every enrolment at a
/// known programme.
pub fn verify_references(
    programmes: &[Programme],
    students: &[Student],
    enrolments: &[EnrolmentRecord],
    performance: &[PerformanceRecord],
) -> SimResult<()> {
    let programme_ids: HashSet<&str> = programmes.iter().map(|p| p.programme_id.as_str()).collect();
    let student_ids: HashSet<&str> = students.iter().map(|s| s.student_id.as_str()).collect();

    for e in enrolments {
        if !student_ids.contains(e.student_id.as_str()) {
            return Err(SimError::UnknownStudent { student_id: e.student_id.clone() });
        }
        if !programme_ids.contains(e.programme_id.as_str()) {
            return Err(SimError::UnknownProgramme { programme_id: e.programme_id.clone() });
        }
    }
    for p in performance {
        if !student_ids.contains(p.student_id.as_str()) {
            return Err(SimError::UnknownStudent { student_id: p.student_id.clone() });
        }
    }
    Ok(())
}
