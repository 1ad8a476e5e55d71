//! Programme catalog generation.
//!
//! Draw order per programme (Catalog stream):
//!   mode, faculty, qualification level, campus, difficulty, subject name.
//! Faculty casing noise is drawn afterwards from the CatalogNoise stream.

use crate::{
    config::SimConfig,
    error::SimResult,
    model::round_to,
    name_bank::NameBank,
    rng::StageRng,
    types::ProgrammeId,
};
use serde::{Deserialize, Serialize};

pub const DIFFICULTY_MIN: f64 = 0.60;
pub const DIFFICULTY_MAX: f64 = 0.90;

pub const FULL_TIME_CREDITS: u32 = 60;
pub const PART_TIME_CREDITS: u32 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StudyMode {
    #[serde(rename = "FT")]
    FullTime,
    #[serde(rename = "PT")]
    PartTime,
}

impl StudyMode {
    /// Credits a student attempts in one academic year.
    pub fn credits_attempted(&self) -> u32 {
        match self {
            Self::FullTime => FULL_TIME_CREDITS,
            Self::PartTime => PART_TIME_CREDITS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Programme {
    pub programme_id: ProgrammeId,
    pub name: String,
    pub faculty: String,
    pub qualification_level: u8,
    pub mode: StudyMode,
    pub campus: String,
    /// Simulation-only: lower = harder. Pulls down both GPA and retention.
    pub difficulty_factor: f64,
}

impl Programme {
    /// Faculty comparison key; tolerant of the casing noise.
    pub fn faculty_key(&self) -> String {
        self.faculty.to_lowercase()
    }
}

pub fn programme_id(index: usize) -> ProgrammeId {
    format!("PRG{:03}", index + 1)
}

/// Generate `config.n_programmes` programmes, then lower-case the faculty
/// on a small sample of them.
pub fn generate_catalog(
    config: &SimConfig,
    rng: &mut StageRng,
    noise_rng: &mut StageRng,
) -> SimResult<Vec<Programme>> {
    config.validate()?;
    let cat = &config.catalog;

    let mut programmes = Vec::with_capacity(config.n_programmes);
    for i in 0..config.n_programmes {
        let mode = if rng.chance(cat.full_time_share) {
            StudyMode::FullTime
        } else {
            StudyMode::PartTime
        };
        let faculty = rng.choose(&cat.faculties).clone();
        let qualification_level =
            cat.qualification_levels[rng.pick_weighted(&cat.qualification_level_weights)];
        let campus = rng.choose(&config.campuses).clone();
        let difficulty_factor = round_to(rng.uniform(DIFFICULTY_MIN, DIFFICULTY_MAX), 2);
        let name = NameBank::programme_name(&faculty, qualification_level, rng);

        programmes.push(Programme {
            programme_id: programme_id(i),
            name,
            faculty,
            qualification_level,
            mode,
            campus,
            difficulty_factor,
        });
    }

    let noisy = (programmes.len() as f64 * cat.faculty_noise_rate).round() as usize;
    for idx in noise_rng.sample_indices(programmes.len(), noisy) {
        let p = &mut programmes[idx];
        p.faculty = p.faculty.to_lowercase();
    }

    log::info!(
        "catalog: generated {} programmes ({noisy} with faculty casing noise)",
        programmes.len()
    );
    Ok(programmes)
}
