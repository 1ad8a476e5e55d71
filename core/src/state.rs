//! Per-student simulation state, owned by a single engine run.

use crate::{
    error::{SimError, SimResult},
    types::{ProgrammeId, StudentId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentYearState {
    pub student_id: StudentId,
    pub current_programme_id: ProgrammeId,
    pub year_of_study: u32,
    /// Once false, never true again.
    pub active: bool,
}

/// Keyed table of student states, iterated in admission order.
///
/// Departed students stay in the table (inactive) so they can never be
/// admitted a second time.
#[derive(Debug, Clone, Default)]
pub struct CohortState {
    rows: Vec<StudentYearState>,
    index: HashMap<StudentId, usize>,
}

impl CohortState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new entrant in year 1 of `programme_id`.
    pub fn admit(&mut self, student_id: &str, programme_id: &str) -> SimResult<()> {
        if self.index.contains_key(student_id) {
            return Err(SimError::DuplicateEntrant { student_id: student_id.to_string() });
        }
        self.index.insert(student_id.to_string(), self.rows.len());
        self.rows.push(StudentYearState {
            student_id: student_id.to_string(),
            current_programme_id: programme_id.to_string(),
            year_of_study: 1,
            active: true,
        });
        Ok(())
    }

    pub fn get(&self, student_id: &str) -> Option<&StudentYearState> {
        self.index.get(student_id).map(|&i| &self.rows[i])
    }

    /// Students ever admitted, active or not.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.rows.iter().filter(|r| r.active).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StudentYearState> {
        self.rows.iter()
    }

    pub(crate) fn active_mut(&mut self) -> impl Iterator<Item = &mut StudentYearState> {
        self.rows.iter_mut().filter(|r| r.active)
    }
}
