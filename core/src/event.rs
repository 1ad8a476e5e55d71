//! The transition log: every state change the engine makes.
//!
//! RULE: The engine records a CohortEvent for each admission, departure,
//! transfer and repeat. Plain progression is the default and is only
//! counted in the YearSummary.

use crate::types::{AcademicYear, ProgrammeId, StudentId};
use serde::{Deserialize, Serialize};

/// Variants are append-only. Never remove or reorder them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CohortEvent {
    EntrantAdmitted {
        academic_year: AcademicYear,
        student_id: StudentId,
        programme_id: ProgrammeId,
    },
    /// Not retained: no further records for this student.
    StudentDeparted {
        academic_year: AcademicYear,
        student_id: StudentId,
        programme_id: ProgrammeId,
        retention_probability: f64,
    },
    StudentTransferred {
        academic_year: AcademicYear,
        student_id: StudentId,
        from_programme_id: ProgrammeId,
        to_programme_id: ProgrammeId,
    },
    StudentRepeatedYear {
        academic_year: AcademicYear,
        student_id: StudentId,
        year_of_study: u32,
    },
}

impl CohortEvent {
    pub fn student_id(&self) -> &str {
        match self {
            Self::EntrantAdmitted { student_id, .. }
            | Self::StudentDeparted { student_id, .. }
            | Self::StudentTransferred { student_id, .. }
            | Self::StudentRepeatedYear { student_id, .. } => student_id,
        }
    }
}

/// Head counts for one simulated year.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearSummary {
    pub academic_year: AcademicYear,
    pub entrants: usize,
    /// Students producing records this year, entrants included.
    pub active: usize,
    /// Carried into the next year. Zero in the final year.
    pub retained: usize,
    pub departed: usize,
    pub transferred: usize,
    pub repeated: usize,
}
