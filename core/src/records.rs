//! Output rows handed to persistence collaborators.
//! Field names are the stable column names of the extracts.

use crate::{
    model::Band,
    types::{AcademicYear, ProgrammeId, StudentId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistrationStatus {
    Registered,
    Withdrawn,
}

/// Grain: student × programme × academic year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrolmentRecord {
    pub student_id: StudentId,
    pub programme_id: ProgrammeId,
    pub academic_year: AcademicYear,
    pub year_of_study: u32,
    pub registration_status: RegistrationStatus,
    pub credits_attempted: u32,
    pub entrant_flag: bool,
    pub gpa_band: Band,
    pub attendance_band: Band,
}

/// Grain: student × academic year. Either metric may be missing after
/// imperfection injection, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRecord {
    pub student_id: StudentId,
    pub academic_year: AcademicYear,
    pub gpa: Option<f64>,
    pub attendance_rate: Option<f64>,
}

impl PerformanceRecord {
    pub fn missing_fields(&self) -> usize {
        usize::from(self.gpa.is_none()) + usize::from(self.attendance_rate.is_none())
    }
}
