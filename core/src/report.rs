//! Cohort-level aggregates over the generated enrolment table.
//!
//! Only `Registered` rows count. Students are de-duplicated per year, so
//! injected duplicate rows never inflate a cohort.
//!
//! A student in year 1 of study in year Y is "retained" when they hold any
//! Registered row in the next academic year, in any programme or year of
//! study.

use crate::{
    model::Band,
    pipeline::Dataset,
    records::{EnrolmentRecord, RegistrationStatus},
    types::{AcademicYear, ProgrammeId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSize {
    pub academic_year: AcademicYear,
    pub students: usize,
}

/// Year-1 cohort of `academic_year` followed into `next_year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRetention {
    pub academic_year: AcademicYear,
    pub next_year: AcademicYear,
    pub cohort: usize,
    pub retained: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRetention {
    pub gpa_band: Band,
    pub cohort: usize,
    pub retained: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgrammeRetention {
    pub programme_id: ProgrammeId,
    pub cohort: usize,
    pub retained: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    /// Distinct Year-1 students per academic year, in year order.
    pub year_one_cohorts: Vec<CohortSize>,
    /// One entry per consecutive pair of academic years.
    pub cohort_retention: Vec<CohortRetention>,
    /// Pooled over every cohort that has a following year, Low → High.
    pub retention_by_gpa_band: Vec<BandRetention>,
    /// First cohort year only, best retention first.
    pub programme_retention: Vec<ProgrammeRetention>,
}

impl CohortReport {
    pub fn from_dataset(data: &Dataset) -> Self {
        Self::from_enrolments(&data.enrolments)
    }

    pub fn from_enrolments(enrolments: &[EnrolmentRecord]) -> Self {
        // Years come from every row, Withdrawn included.
        let years: Vec<&str> = enrolments
            .iter()
            .map(|e| e.academic_year.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut present: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
        let mut year_one: BTreeMap<&str, BTreeSet<(&str, &str, Band)>> = BTreeMap::new();
        let registered = enrolments
            .iter()
            .filter(|e| e.registration_status == RegistrationStatus::Registered);
        for e in registered {
            let year = e.academic_year.as_str();
            present.entry(year).or_default().insert(e.student_id.as_str());
            if e.year_of_study == 1 {
                year_one.entry(year).or_default().insert((
                    e.student_id.as_str(),
                    e.programme_id.as_str(),
                    e.gpa_band,
                ));
            }
        }

        let year_one_cohorts = year_one
            .iter()
            .map(|(year, rows)| CohortSize {
                academic_year: year.to_string(),
                students: distinct_students(rows).len(),
            })
            .collect();

        let empty = HashSet::new();
        let no_rows = BTreeSet::new();
        let mut cohort_retention = Vec::new();
        let mut by_band: BTreeMap<Band, (usize, usize)> = BTreeMap::new();
        for pair in years.windows(2) {
            let (year, next_year) = (pair[0], pair[1]);
            let next = present.get(next_year).unwrap_or(&empty);
            let rows = year_one.get(year).unwrap_or(&no_rows);

            let cohort = distinct_students(rows);
            let retained = cohort.iter().filter(|s| next.contains(*s)).count();
            cohort_retention.push(CohortRetention {
                academic_year: year.to_string(),
                next_year: next_year.to_string(),
                cohort: cohort.len(),
                retained,
                rate: ratio(retained, cohort.len()),
            });

            let banded: BTreeSet<(&str, Band)> =
                rows.iter().map(|&(student, _, band)| (student, band)).collect();
            for (student, band) in banded {
                let slot = by_band.entry(band).or_default();
                slot.0 += 1;
                slot.1 += usize::from(next.contains(student));
            }
        }

        let retention_by_gpa_band = by_band
            .into_iter()
            .map(|(gpa_band, (cohort, retained))| BandRetention {
                gpa_band,
                cohort,
                retained,
                rate: ratio(retained, cohort),
            })
            .collect();

        let programme_retention = match years.as_slice() {
            [first, second, ..] => programme_ranking(
                year_one.get(first).unwrap_or(&no_rows),
                present.get(second).unwrap_or(&empty),
            ),
            _ => Vec::new(),
        };

        let report = Self {
            year_one_cohorts,
            cohort_retention,
            retention_by_gpa_band,
            programme_retention,
        };
        log::info!(
            "report: {} cohorts, {} retention pairs, {} ranked programmes",
            report.year_one_cohorts.len(),
            report.cohort_retention.len(),
            report.programme_retention.len()
        );
        report
    }

    pub fn top_programmes(&self, n: usize) -> &[ProgrammeRetention] {
        &self.programme_retention[..n.min(self.programme_retention.len())]
    }

    pub fn bottom_programmes(&self, n: usize) -> &[ProgrammeRetention] {
        let len = self.programme_retention.len();
        &self.programme_retention[len - n.min(len)..]
    }
}

fn distinct_students<'r>(rows: &BTreeSet<(&'r str, &str, Band)>) -> BTreeSet<&'r str> {
    rows.iter().map(|&(student, _, _)| student).collect()
}

/// Empty cohorts report a rate of 0.
fn ratio(retained: usize, cohort: usize) -> f64 {
    retained as f64 / cohort.max(1) as f64
}

fn programme_ranking(
    year_one: &BTreeSet<(&str, &str, Band)>,
    next: &HashSet<&str>,
) -> Vec<ProgrammeRetention> {
    let pairs: BTreeSet<(&str, &str)> =
        year_one.iter().map(|&(student, programme, _)| (programme, student)).collect();

    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (programme, student) in pairs {
        let slot = counts.entry(programme).or_default();
        slot.0 += 1;
        slot.1 += usize::from(next.contains(student));
    }

    let mut ranking: Vec<ProgrammeRetention> = counts
        .into_iter()
        .map(|(programme_id, (cohort, retained))| ProgrammeRetention {
            programme_id: programme_id.to_string(),
            cohort,
            retained,
            rate: ratio(retained, cohort),
        })
        .collect();
    // Ties keep programme id order.
    ranking.sort_by(|a, b| b.rate.total_cmp(&a.rate));
    ranking
}
