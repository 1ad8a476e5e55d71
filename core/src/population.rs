//! Student population generation.
//!
//! Draw order per student (Population stream):
//!   typical/mature, age, birth month, birth day, gender, entry route,
//!   access flag, nationality group, home campus.
//! Then, still on the Population stream: gender spelling noise and
//! entry-route casing noise. Missing entry route and missing gender each
//! draw from their own stream so the two gaps are uncorrelated.

use crate::{
    config::SimConfig,
    error::{SimError, SimResult},
    rng::StageRng,
    types::StudentId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Birth days stop at 28 so every month yields a valid date.
pub const MAX_BIRTH_DAY: u32 = 28;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub student_id: StudentId,
    pub gender: Option<String>,
    pub date_of_birth: NaiveDate,
    pub entry_route: Option<String>,
    pub access_flag: bool,
    pub nationality_group: String,
    pub home_campus: String,
}

pub fn student_id(index: usize) -> StudentId {
    format!("STU{:06}", index + 1)
}

/// Generate `n` students with independent per-attribute draws, then apply
/// the source-system noise passes.
pub fn generate_population(
    config: &SimConfig,
    n: usize,
    rng: &mut StageRng,
    entry_route_missing_rng: &mut StageRng,
    gender_missing_rng: &mut StageRng,
) -> SimResult<Vec<Student>> {
    config.validate()?;
    let pop = &config.population;

    let mut students = Vec::with_capacity(n);
    for i in 0..n {
        let (low, high) = if rng.chance(pop.typical_share) {
            pop.typical_age_range
        } else {
            pop.mature_age_range
        };
        let age = rng.range_inclusive(low, high);
        let month = rng.range_inclusive(1, 12);
        let day = rng.range_inclusive(1, MAX_BIRTH_DAY);
        let year = pop.reference_year - age as i32;
        let date_of_birth = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(SimError::InvalidDate { year, month, day })?;

        let gender = pop.genders[rng.pick_weighted(&pop.gender_weights)].clone();
        let entry_route = pop.entry_routes[rng.pick_weighted(&pop.entry_route_weights)].clone();
        let access_flag = rng.chance(pop.access_probability);
        let nationality_group =
            pop.nationality_groups[rng.pick_weighted(&pop.nationality_weights)].clone();
        let home_campus = rng.choose(&config.campuses).clone();

        students.push(Student {
            student_id: student_id(i),
            gender: Some(gender),
            date_of_birth,
            entry_route: Some(entry_route),
            access_flag,
            nationality_group,
            home_campus,
        });
    }

    let gender_noise = (n as f64 * pop.gender_noise_rate) as usize;
    for idx in rng.sample_indices(n, gender_noise) {
        let s = &mut students[idx];
        if let Some(g) = s.gender.take() {
            s.gender = Some(misspelt_gender(&g, rng));
        }
    }

    let route_noise = (n as f64 * pop.entry_route_noise_rate) as usize;
    for idx in rng.sample_indices(n, route_noise) {
        let s = &mut students[idx];
        s.entry_route = s.entry_route.as_deref().map(str::to_lowercase);
    }

    let missing_route = (n as f64 * pop.missing_entry_route_rate).round() as usize;
    for idx in entry_route_missing_rng.sample_indices(n, missing_route) {
        students[idx].entry_route = None;
    }

    let missing_gender = (n as f64 * pop.missing_gender_rate).round() as usize;
    for idx in gender_missing_rng.sample_indices(n, missing_gender) {
        students[idx].gender = None;
    }

    log::info!(
        "population: generated {n} students (gender noise={gender_noise}, \
         route noise={route_noise}, missing route={missing_route}, missing gender={missing_gender})"
    );
    Ok(students)
}

/// Inconsistent but recognisable spelling of a clean gender label.
fn misspelt_gender(clean: &str, rng: &mut StageRng) -> String {
    let variants: &[&str] = match clean {
        "Male" => &["male", "M", "MALE"],
        "Female" => &["female", "F", "FEMALE"],
        _ => &["Unknown", "Other", "Not Stated"],
    };
    rng.choose(variants).to_string()
}
