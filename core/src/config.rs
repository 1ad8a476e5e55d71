use crate::{
    engine::SimulationParams,
    error::{SimError, SimResult},
    imperfection::NoiseRates,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level generator configuration.
///
/// Every field has a default, so a config file only needs to name
/// the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub academic_years: Vec<String>,
    pub n_programmes: usize,
    pub new_entrants_per_year: usize,
    /// Population size. Defaults to one full cohort per academic year.
    pub total_students: Option<usize>,
    pub transfer_rate: f64,
    pub repeat_rate_if_low_gpa: f64,
    pub missing_perf_rate: f64,
    pub duplicate_enrolment_rate: f64,
    pub withdrawn_noise_rate: f64,
    /// Shared by programme delivery campus and student home campus.
    pub campuses: Vec<String>,
    pub catalog: CatalogConfig,
    pub population: PopulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub faculties: Vec<String>,
    pub qualification_levels: Vec<u8>,
    pub qualification_level_weights: Vec<f64>,
    pub full_time_share: f64,
    /// Fraction of programmes whose faculty label is lower-cased.
    pub faculty_noise_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    pub typical_share: f64,
    pub typical_age_range: (u32, u32),
    pub mature_age_range: (u32, u32),
    /// Year ages are measured against when deriving dates of birth.
    pub reference_year: i32,
    pub genders: Vec<String>,
    pub gender_weights: Vec<f64>,
    pub gender_noise_rate: f64,
    pub entry_routes: Vec<String>,
    pub entry_route_weights: Vec<f64>,
    pub entry_route_noise_rate: f64,
    pub access_probability: f64,
    pub nationality_groups: Vec<String>,
    pub nationality_weights: Vec<f64>,
    pub missing_entry_route_rate: f64,
    pub missing_gender_rate: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            academic_years: ["2020/21", "2021/22", "2022/23", "2023/24", "2024/25"]
                .iter()
                .map(|y| y.to_string())
                .collect(),
            n_programmes: 40,
            new_entrants_per_year: 2400,
            total_students: None,
            transfer_rate: 0.05,
            repeat_rate_if_low_gpa: 0.15,
            missing_perf_rate: 0.015,
            duplicate_enrolment_rate: 0.005,
            withdrawn_noise_rate: 0.01,
            campuses: strings(&["Athlone", "Moylish", "Thurles", "Clonmel", "Ennis"]),
            catalog: CatalogConfig::default(),
            population: PopulationConfig::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            faculties: strings(&[
                "Business",
                "Engineering",
                "Science",
                "Arts",
                "Health",
                "Computing",
            ]),
            qualification_levels: vec![6, 7, 8],
            qualification_level_weights: vec![0.20, 0.25, 0.55],
            full_time_share: 0.85,
            faculty_noise_rate: 0.02,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            typical_share: 0.85,
            typical_age_range: (18, 24),
            mature_age_range: (25, 55),
            reference_year: 2020,
            genders: strings(&["Male", "Female", "Other/Unknown"]),
            gender_weights: vec![0.48, 0.48, 0.04],
            gender_noise_rate: 0.06,
            entry_routes: strings(&["CAO", "QQI/FET", "Mature", "International", "Other"]),
            entry_route_weights: vec![0.65, 0.15, 0.10, 0.07, 0.03],
            entry_route_noise_rate: 0.02,
            access_probability: 0.18,
            nationality_groups: strings(&["Irish", "EU", "Non-EU"]),
            nationality_weights: vec![0.82, 0.10, 0.08],
            missing_entry_route_rate: 0.01,
            missing_gender_rate: 0.01,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config = Self::from_json_str(&content)?;
        log::info!("config: loaded {} (seed={})", path.display(), config.seed);
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Small, fast configuration for tests: 3 years, 8 programmes,
    /// 60 entrants per year.
    pub fn default_test() -> Self {
        Self {
            seed: 7,
            academic_years: strings(&["2020/21", "2021/22", "2022/23"]),
            n_programmes: 8,
            new_entrants_per_year: 60,
            ..Self::default()
        }
    }

    pub fn total_students(&self) -> usize {
        self.total_students
            .unwrap_or(self.new_entrants_per_year * self.academic_years.len())
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            transfer_rate: self.transfer_rate,
            repeat_rate_if_low_gpa: self.repeat_rate_if_low_gpa,
        }
    }

    pub fn noise_rates(&self) -> NoiseRates {
        NoiseRates {
            missing_perf_rate: self.missing_perf_rate,
            duplicate_enrolment_rate: self.duplicate_enrolment_rate,
            withdrawn_noise_rate: self.withdrawn_noise_rate,
        }
    }

    /// Reject configurations the generators cannot honour.
    pub fn validate(&self) -> SimResult<()> {
        if self.academic_years.is_empty() {
            return Err(invalid("academic_years must not be empty"));
        }
        for (i, year) in self.academic_years.iter().enumerate() {
            if self.academic_years[..i].contains(year) {
                return Err(invalid(format!("academic year '{year}' listed twice")));
            }
        }
        if self.n_programmes == 0 {
            return Err(invalid("n_programmes must be at least 1"));
        }
        non_empty("campuses", &self.campuses)?;

        check_rate("transfer_rate", self.transfer_rate)?;
        check_rate("repeat_rate_if_low_gpa", self.repeat_rate_if_low_gpa)?;
        check_rate("missing_perf_rate", self.missing_perf_rate)?;
        check_rate("duplicate_enrolment_rate", self.duplicate_enrolment_rate)?;
        check_rate("withdrawn_noise_rate", self.withdrawn_noise_rate)?;

        self.catalog.validate()?;
        self.population.validate()
    }
}

impl CatalogConfig {
    fn validate(&self) -> SimResult<()> {
        non_empty("catalog.faculties", &self.faculties)?;
        check_weights(
            "catalog.qualification_level_weights",
            self.qualification_levels.len(),
            &self.qualification_level_weights,
        )?;
        check_rate("catalog.full_time_share", self.full_time_share)?;
        check_rate("catalog.faculty_noise_rate", self.faculty_noise_rate)
    }
}

impl PopulationConfig {
    fn validate(&self) -> SimResult<()> {
        check_rate("population.typical_share", self.typical_share)?;
        check_age_range("population.typical_age_range", self.typical_age_range)?;
        check_age_range("population.mature_age_range", self.mature_age_range)?;
        check_weights("population.gender_weights", self.genders.len(), &self.gender_weights)?;
        check_weights(
            "population.entry_route_weights",
            self.entry_routes.len(),
            &self.entry_route_weights,
        )?;
        check_weights(
            "population.nationality_weights",
            self.nationality_groups.len(),
            &self.nationality_weights,
        )?;
        check_rate("population.gender_noise_rate", self.gender_noise_rate)?;
        check_rate("population.entry_route_noise_rate", self.entry_route_noise_rate)?;
        check_rate("population.access_probability", self.access_probability)?;
        check_rate("population.missing_entry_route_rate", self.missing_entry_route_rate)?;
        check_rate("population.missing_gender_rate", self.missing_gender_rate)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn invalid(msg: impl Into<String>) -> SimError {
    SimError::InvalidConfig(msg.into())
}

fn non_empty(name: &str, items: &[String]) -> SimResult<()> {
    if items.is_empty() {
        return Err(invalid(format!("{name} must not be empty")));
    }
    Ok(())
}

fn check_rate(name: &str, value: f64) -> SimResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{name}={value} must lie in [0, 1]")));
    }
    Ok(())
}

fn check_weights(name: &str, categories: usize, weights: &[f64]) -> SimResult<()> {
    if categories == 0 {
        return Err(invalid(format!("{name}: no categories to weight")));
    }
    if weights.len() != categories {
        return Err(invalid(format!(
            "{name}: {} weights for {categories} categories",
            weights.len()
        )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(invalid(format!("{name}: weights must be finite and non-negative")));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(invalid(format!("{name}: weights sum to zero")));
    }
    Ok(())
}

fn check_age_range(name: &str, (low, high): (u32, u32)) -> SimResult<()> {
    if low > high {
        return Err(invalid(format!("{name}: {low} > {high}")));
    }
    Ok(())
}
