//! The cohort simulation engine.
//!
//! EXECUTION ORDER per academic year (fixed, documented, never reordered):
//!   1. Admit this year's entrants, one programme draw each.
//!   2. For each active student, in admission order:
//!        a. draw GPA and attendance, emit one performance row and one
//!           enrolment row;
//!        b. unless this is the final year: retention draw, transfer draw,
//!           [transfer pick], [repeat draw, only when GPA < 1.8].
//!
//! RULES:
//!   - The engine owns no state between runs. CohortState is passed in.
//!   - All randomness flows through the caller's Simulation stream.
//!   - Cohorts are planned once per run: one shuffle of the population,
//!     sliced contiguously, so each student enters in at most one year.

use crate::{
    catalog::Programme,
    error::{SimError, SimResult},
    event::{CohortEvent, YearSummary},
    model::{retention_probability, round_to, YearPerformance, LOW_GPA_REPEAT_THRESHOLD},
    population::Student,
    records::{EnrolmentRecord, PerformanceRecord, RegistrationStatus},
    rng::StageRng,
    state::{CohortState, StudentYearState},
    types::{AcademicYear, StudentId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub transfer_rate: f64,
    pub repeat_rate_if_low_gpa: f64,
}

/// Inputs for a single call to `advance_one_year`.
#[derive(Debug, Clone, Copy)]
pub struct YearStep<'s> {
    pub academic_year: &'s str,
    pub entrants: &'s [StudentId],
    /// No transition decisions are made in the last simulated year.
    pub final_year: bool,
}

#[derive(Debug, Clone, Default)]
pub struct YearOutput {
    pub enrolments: Vec<EnrolmentRecord>,
    pub performance: Vec<PerformanceRecord>,
    pub events: Vec<CohortEvent>,
    pub summary: YearSummary,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationOutput {
    pub enrolments: Vec<EnrolmentRecord>,
    pub performance: Vec<PerformanceRecord>,
    pub events: Vec<CohortEvent>,
    pub summaries: Vec<YearSummary>,
}

impl SimulationOutput {
    fn absorb(&mut self, year: YearOutput) {
        self.enrolments.extend(year.enrolments);
        self.performance.extend(year.performance);
        self.events.extend(year.events);
        self.summaries.push(year.summary);
    }
}

/// Outcome of one student's end-of-year decisions.
enum Transition<'a> {
    Departed { retention_probability: f64 },
    Retained { transfer_to: Option<&'a Programme>, repeat: bool },
}

impl YearOutput {
    /// Apply a transition to the student's state and record its event.
    fn record(
        &mut self,
        st: &mut StudentYearState,
        programme: &Programme,
        year: &str,
        transition: Transition<'_>,
    ) {
        match transition {
            Transition::Departed { retention_probability } => {
                st.active = false;
                self.summary.departed += 1;
                self.events.push(CohortEvent::StudentDeparted {
                    academic_year: year.to_string(),
                    student_id: st.student_id.clone(),
                    programme_id: st.current_programme_id.clone(),
                    retention_probability,
                });
            }
            Transition::Retained { transfer_to, repeat } => {
                self.summary.retained += 1;
                if let Some(target) = transfer_to {
                    self.summary.transferred += 1;
                    self.events.push(CohortEvent::StudentTransferred {
                        academic_year: year.to_string(),
                        student_id: st.student_id.clone(),
                        from_programme_id: programme.programme_id.clone(),
                        to_programme_id: target.programme_id.clone(),
                    });
                    st.current_programme_id = target.programme_id.clone();
                }
                if repeat {
                    self.summary.repeated += 1;
                    self.events.push(CohortEvent::StudentRepeatedYear {
                        academic_year: year.to_string(),
                        student_id: st.student_id.clone(),
                        year_of_study: st.year_of_study,
                    });
                } else {
                    st.year_of_study += 1;
                }
            }
        }
    }
}

pub struct CohortEngine<'a> {
    params: SimulationParams,
    catalog: &'a [Programme],
    programmes: HashMap<&'a str, &'a Programme>,
    /// Lower-cased faculty → programmes, in catalog order.
    faculties: HashMap<String, Vec<&'a Programme>>,
    students: &'a [Student],
    access: HashMap<&'a str, bool>,
}

impl<'a> CohortEngine<'a> {
    pub fn new(
        catalog: &'a [Programme],
        students: &'a [Student],
        params: SimulationParams,
    ) -> SimResult<Self> {
        if catalog.is_empty() {
            return Err(SimError::InvalidConfig("programme catalog is empty".into()));
        }

        let mut programmes = HashMap::with_capacity(catalog.len());
        let mut faculties: HashMap<String, Vec<&Programme>> = HashMap::new();
        for p in catalog {
            if programmes.insert(p.programme_id.as_str(), p).is_some() {
                return Err(SimError::InvalidConfig(format!(
                    "programme id '{}' appears twice in the catalog",
                    p.programme_id
                )));
            }
            faculties.entry(p.faculty_key()).or_default().push(p);
        }

        let mut access = HashMap::with_capacity(students.len());
        for s in students {
            if access.insert(s.student_id.as_str(), s.access_flag).is_some() {
                return Err(SimError::InvalidConfig(format!(
                    "student id '{}' appears twice in the population",
                    s.student_id
                )));
            }
        }

        Ok(Self { params, catalog, programmes, faculties, students, access })
    }

    /// Shuffle the whole population once and slice it into one disjoint
    /// entrant cohort per year. Later cohorts come up short (or empty)
    /// when the population runs out.
    pub fn plan_cohorts(
        &self,
        n_years: usize,
        entrants_per_year: usize,
        rng: &mut StageRng,
    ) -> Vec<Vec<StudentId>> {
        let mut ids: Vec<StudentId> = self.students.iter().map(|s| s.student_id.clone()).collect();
        rng.shuffle(&mut ids);

        let needed = n_years * entrants_per_year;
        if needed > ids.len() {
            log::warn!(
                "engine: population of {} cannot fill {n_years} cohorts of {entrants_per_year}",
                ids.len()
            );
        }

        (0..n_years)
            .map(|i| {
                let start = (i * entrants_per_year).min(ids.len());
                let end = ((i + 1) * entrants_per_year).min(ids.len());
                ids[start..end].to_vec()
            })
            .collect()
    }

    /// Advance the simulation by one academic year.
    pub fn advance_one_year(
        &self,
        state: &mut CohortState,
        step: &YearStep<'_>,
        rng: &mut StageRng,
    ) -> SimResult<YearOutput> {
        let year = step.academic_year;
        let mut out = YearOutput {
            summary: YearSummary { academic_year: year.to_string(), ..YearSummary::default() },
            ..YearOutput::default()
        };

        // 1. Entrant injection.
        for student_id in step.entrants {
            self.access_flag(student_id)?;
            let programme = rng.choose(self.catalog);
            state.admit(student_id, &programme.programme_id)?;
            out.events.push(CohortEvent::EntrantAdmitted {
                academic_year: year.to_string(),
                student_id: student_id.clone(),
                programme_id: programme.programme_id.clone(),
            });
        }
        out.summary.entrants = step.entrants.len();

        // 2 + 3. Emission and transition, student by student.
        for st in state.active_mut() {
            let programme = self.programme(&st.current_programme_id)?;
            let access = self.access_flag(&st.student_id)?;
            let perf = YearPerformance::draw(programme.difficulty_factor, access, rng);

            out.performance.push(PerformanceRecord {
                student_id: st.student_id.clone(),
                academic_year: year.to_string(),
                gpa: Some(round_to(perf.gpa, 2)),
                attendance_rate: Some(round_to(perf.attendance, 1)),
            });
            out.enrolments.push(enrolment_row(st, programme, year, &perf));
            out.summary.active += 1;

            if step.final_year {
                continue;
            }
            let transition = self.decide(programme, access, &perf, rng);
            out.record(st, programme, year, transition);
        }

        log::info!(
            "year={year} engine: entrants={} active={} retained={} departed={} transferred={} repeated={}",
            out.summary.entrants,
            out.summary.active,
            out.summary.retained,
            out.summary.departed,
            out.summary.transferred,
            out.summary.repeated,
        );
        Ok(out)
    }

    /// Run every academic year in order, starting from an empty state.
    pub fn run(
        &self,
        academic_years: &[AcademicYear],
        entrants_per_year: usize,
        rng: &mut StageRng,
    ) -> SimResult<SimulationOutput> {
        let cohorts = self.plan_cohorts(academic_years.len(), entrants_per_year, rng);
        let mut state = CohortState::new();
        let mut output = SimulationOutput::default();

        for (i, (year, entrants)) in academic_years.iter().zip(&cohorts).enumerate() {
            let step = YearStep {
                academic_year: year,
                entrants,
                final_year: i + 1 == academic_years.len(),
            };
            output.absorb(self.advance_one_year(&mut state, &step, rng)?);
        }

        log::info!(
            "engine: simulated {} years, {} students admitted, {} enrolment rows",
            academic_years.len(),
            state.len(),
            output.enrolments.len()
        );
        Ok(output)
    }

    /// Retention draw, transfer draw, [transfer pick], [repeat draw].
    /// The repeat draw is only taken when GPA is below the threshold.
    fn decide(
        &self,
        programme: &'a Programme,
        access: bool,
        perf: &YearPerformance,
        rng: &mut StageRng,
    ) -> Transition<'a> {
        let p_retain = retention_probability(perf, access, programme.difficulty_factor);
        if !rng.chance(p_retain) {
            return Transition::Departed { retention_probability: p_retain };
        }

        let transfer_to = if rng.chance(self.params.transfer_rate) {
            self.transfer_target(programme, rng)
        } else {
            None
        };
        let repeat =
            perf.gpa < LOW_GPA_REPEAT_THRESHOLD && rng.chance(self.params.repeat_rate_if_low_gpa);

        Transition::Retained { transfer_to, repeat }
    }

    /// Another programme in the same faculty, ignoring faculty casing.
    /// None when the faculty has no alternative.
    fn transfer_target(&self, current: &Programme, rng: &mut StageRng) -> Option<&'a Programme> {
        let candidates: Vec<&'a Programme> = self
            .faculties
            .get(&current.faculty_key())?
            .iter()
            .copied()
            .filter(|p| p.programme_id != current.programme_id)
            .collect();
        if candidates.is_empty() {
            log::debug!(
                "engine: no transfer target for {}, faculty '{}' has no other programme",
                current.programme_id,
                current.faculty
            );
            return None;
        }
        Some(*rng.choose(&candidates))
    }

    fn programme(&self, programme_id: &str) -> SimResult<&'a Programme> {
        self.programmes
            .get(programme_id)
            .copied()
            .ok_or_else(|| SimError::UnknownProgramme { programme_id: programme_id.to_string() })
    }

    fn access_flag(&self, student_id: &str) -> SimResult<bool> {
        self.access
            .get(student_id)
            .copied()
            .ok_or_else(|| SimError::UnknownStudent { student_id: student_id.to_string() })
    }
}

fn enrolment_row(
    st: &StudentYearState,
    programme: &Programme,
    year: &str,
    perf: &YearPerformance,
) -> EnrolmentRecord {
    EnrolmentRecord {
        student_id: st.student_id.clone(),
        programme_id: programme.programme_id.clone(),
        academic_year: year.to_string(),
        year_of_study: st.year_of_study,
        registration_status: RegistrationStatus::Registered,
        credits_attempted: programme.mode.credits_attempted(),
        entrant_flag: st.year_of_study == 1,
        gpa_band: perf.gpa_band(),
        attendance_band: perf.attendance_band(),
    }
}
