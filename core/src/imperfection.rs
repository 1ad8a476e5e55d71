//! Post-simulation data-quality noise.
//!
//! Three passes, applied in this order, each on its own stream:
//!   1. null one metric on a sample of performance rows;
//!   2. append verbatim copies of a sample of enrolment rows;
//!   3. flip a sample of enrolment rows (duplicates included) to Withdrawn.
//!
//! RULE: Only value fields change. Identifiers, years and programme
//! references are never touched.

use crate::{
    records::{EnrolmentRecord, PerformanceRecord, RegistrationStatus},
    rng::{RngBank, StageRng, StageSlot},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseRates {
    pub missing_perf_rate: f64,
    pub duplicate_enrolment_rate: f64,
    /// At least one row is always flipped when any rows exist.
    pub withdrawn_noise_rate: f64,
}

/// One stream per pass, so changing one rate never shifts another
/// pass's selection.
pub struct NoiseStreams {
    pub performance_missing: StageRng,
    pub enrolment_duplicates: StageRng,
    pub status_noise: StageRng,
}

impl NoiseStreams {
    pub fn from_bank(bank: &RngBank) -> Self {
        Self {
            performance_missing: bank.for_stage(StageSlot::PerformanceMissing),
            enrolment_duplicates: bank.for_stage(StageSlot::EnrolmentDuplicates),
            status_noise: bank.for_stage(StageSlot::StatusNoise),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionReport {
    pub gpa_nulled: usize,
    pub attendance_nulled: usize,
    pub duplicated: usize,
    pub withdrawn: usize,
}

pub struct ImperfectionInjector {
    rates: NoiseRates,
}

impl ImperfectionInjector {
    pub fn new(rates: NoiseRates) -> Self {
        Self { rates }
    }

    pub fn apply(
        &self,
        enrolments: &mut Vec<EnrolmentRecord>,
        performance: &mut [PerformanceRecord],
        streams: &mut NoiseStreams,
    ) -> InjectionReport {
        let (gpa_nulled, attendance_nulled) = null_performance_fields(
            performance,
            self.rates.missing_perf_rate,
            &mut streams.performance_missing,
        );
        let duplicated = duplicate_enrolments(
            enrolments,
            self.rates.duplicate_enrolment_rate,
            &mut streams.enrolment_duplicates,
        );
        let withdrawn =
            inject_status_noise(enrolments, self.rates.withdrawn_noise_rate, &mut streams.status_noise);

        let report = InjectionReport { gpa_nulled, attendance_nulled, duplicated, withdrawn };
        log::info!(
            "imperfection: nulled gpa={} attendance={}, duplicated={}, withdrawn={}",
            report.gpa_nulled,
            report.attendance_nulled,
            report.duplicated,
            report.withdrawn
        );
        report
    }
}

/// Null either GPA or attendance (even odds) on `floor(len × rate)`
/// distinct rows. Returns (gpa nulled, attendance nulled).
pub fn null_performance_fields(
    performance: &mut [PerformanceRecord],
    rate: f64,
    rng: &mut StageRng,
) -> (usize, usize) {
    let n = (performance.len() as f64 * rate) as usize;
    let (mut gpa, mut attendance) = (0, 0);
    for idx in rng.sample_indices(performance.len(), n) {
        let row = &mut performance[idx];
        if rng.chance(0.5) {
            row.gpa = None;
            gpa += 1;
        } else {
            row.attendance_rate = None;
            attendance += 1;
        }
    }
    (gpa, attendance)
}

/// Append verbatim copies of `floor(len × rate)` distinct rows, in
/// selection order. Returns the number appended.
pub fn duplicate_enrolments(
    enrolments: &mut Vec<EnrolmentRecord>,
    rate: f64,
    rng: &mut StageRng,
) -> usize {
    let n = (enrolments.len() as f64 * rate) as usize;
    let picked = rng.sample_indices(enrolments.len(), n);
    let copies: Vec<EnrolmentRecord> = picked.iter().map(|&i| enrolments[i].clone()).collect();
    enrolments.extend(copies);
    picked.len()
}

/// Overwrite the status of `max(1, floor(len × rate))` distinct rows with
/// Withdrawn. Returns the number of rows selected.
pub fn inject_status_noise(
    enrolments: &mut [EnrolmentRecord],
    rate: f64,
    rng: &mut StageRng,
) -> usize {
    let n = ((enrolments.len() as f64 * rate) as usize).max(1);
    let picked = rng.sample_indices(enrolments.len(), n);
    for &idx in &picked {
        enrolments[idx].registration_status = RegistrationStatus::Withdrawn;
    }
    picked.len()
}
