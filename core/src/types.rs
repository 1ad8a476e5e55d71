//! Shared primitive types used across the entire generator.

/// A stable, unique programme identifier, e.g. `PRG007`.
pub type ProgrammeId = String;

/// A stable, unique student identifier, e.g. `STU000042`.
pub type StudentId = String;

/// An academic year label, e.g. `2020/21`. One label = one simulation step.
pub type AcademicYear = String;
