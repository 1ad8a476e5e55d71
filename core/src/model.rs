//! Per-student, per-year academic model: GPA, attendance, bands and
//! retention probability. Pure functions; randomness comes in through
//! the caller's stream.

use crate::rng::StageRng;
use serde::{Deserialize, Serialize};

pub const BASE_GPA: f64 = 2.85;
pub const GPA_STD_DEV: f64 = 0.45;
/// Difficulty at which a programme neither helps nor hurts GPA.
pub const DIFFICULTY_MIDPOINT: f64 = 0.75;
pub const DIFFICULTY_GPA_WEIGHT: f64 = 1.2;
pub const ACCESS_GPA_SHIFT: f64 = -0.10;
pub const GPA_MIN: f64 = 1.0;
pub const GPA_MAX: f64 = 4.0;

pub const ATTENDANCE_INTERCEPT: f64 = 55.0;
pub const ATTENDANCE_PER_GPA_POINT: f64 = 12.5;
pub const ATTENDANCE_NOISE_STD_DEV: f64 = 8.0;
pub const ATTENDANCE_MIN: f64 = 30.0;
pub const ATTENDANCE_MAX: f64 = 100.0;

pub const BASE_RETENTION: f64 = 0.82;
pub const RETENTION_MIN: f64 = 0.05;
pub const RETENTION_MAX: f64 = 0.98;

/// Below this GPA a retained student may be held back a year.
pub const LOW_GPA_REPEAT_THRESHOLD: f64 = 1.8;

/// One student's unrounded results for one academic year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearPerformance {
    pub gpa: f64,
    pub attendance: f64,
}

impl YearPerformance {
    /// Draw GPA, then attendance from GPA. Consumes two normals (four
    /// uniforms) from `rng`.
    pub fn draw(difficulty_factor: f64, access_flag: bool, rng: &mut StageRng) -> Self {
        let difficulty_shift = (difficulty_factor - DIFFICULTY_MIDPOINT) * DIFFICULTY_GPA_WEIGHT;
        let access_shift = if access_flag { ACCESS_GPA_SHIFT } else { 0.0 };

        let gpa = rng
            .normal(BASE_GPA + difficulty_shift + access_shift, GPA_STD_DEV)
            .clamp(GPA_MIN, GPA_MAX);

        // Attendance tracks GPA; the two must stay positively correlated.
        let attendance = (ATTENDANCE_INTERCEPT
            + gpa * ATTENDANCE_PER_GPA_POINT
            + rng.normal(0.0, ATTENDANCE_NOISE_STD_DEV))
        .clamp(ATTENDANCE_MIN, ATTENDANCE_MAX);

        Self { gpa, attendance }
    }

    pub fn gpa_band(&self) -> Band {
        Band::from_gpa(self.gpa)
    }

    pub fn attendance_band(&self) -> Band {
        Band::from_attendance(self.attendance)
    }
}

/// Additive retention score before programme difficulty is applied.
/// Always within [0.50, 0.87].
pub fn additive_retention(perf: &YearPerformance, access_flag: bool) -> f64 {
    let mut p = BASE_RETENTION;

    if perf.gpa < 2.0 {
        p -= 0.18;
    } else if perf.gpa < 2.8 {
        p -= 0.07;
    } else if perf.gpa >= 3.2 {
        p += 0.03;
    }

    if perf.attendance < 70.0 {
        p -= 0.10;
    } else if perf.attendance >= 90.0 {
        p += 0.02;
    }

    if access_flag {
        p -= 0.04;
    }
    p
}

/// Probability of continuing into the next academic year.
pub fn retention_probability(
    perf: &YearPerformance,
    access_flag: bool,
    difficulty_factor: f64,
) -> f64 {
    (additive_retention(perf, access_flag) * difficulty_factor).clamp(RETENTION_MIN, RETENTION_MAX)
}

/// Coarse Low/Med/High bucket over a continuous metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    Low,
    Med,
    High,
}

impl Band {
    pub fn from_gpa(gpa: f64) -> Self {
        if gpa < 2.0 {
            Self::Low
        } else if gpa < 3.2 {
            Self::Med
        } else {
            Self::High
        }
    }

    pub fn from_attendance(attendance: f64) -> Self {
        if attendance < 70.0 {
            Self::Low
        } else if attendance < 90.0 {
            Self::Med
        } else {
            Self::High
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
