//! Deterministic programme naming from curated per-faculty lists.
//!
//! All generation is deterministic (same RNG seed = same names).

use crate::rng::StageRng;

/// Deterministic programme name generator.
pub struct NameBank;

impl NameBank {
    /// Full programme title, e.g. "Honours Degree in Data Analytics".
    pub fn programme_name(faculty: &str, qualification_level: u8, rng: &mut StageRng) -> String {
        let subject = Self::subject(faculty, rng);
        format!("{} in {}", Self::award_prefix(qualification_level), subject)
    }

    /// Award title for a qualification level. Anything above 7 is an honours award.
    pub fn award_prefix(qualification_level: u8) -> &'static str {
        match qualification_level {
            0..=6 => "Higher Certificate",
            7 => "Ordinary Degree",
            _ => "Honours Degree",
        }
    }

    /// Draw a subject for the faculty. Faculties without a curated list
    /// still consume one draw so the stream position does not depend on
    /// the faculty set.
    pub fn subject(faculty: &str, rng: &mut StageRng) -> String {
        match Self::subjects(faculty) {
            Some(list) => rng.choose(list).to_string(),
            None => {
                let _ = rng.next_f64();
                format!("{faculty} Studies")
            }
        }
    }

    fn subjects(faculty: &str) -> Option<&'static [&'static str]> {
        let list: &'static [&'static str] = match faculty.to_ascii_lowercase().as_str() {
            "business" => &[
                "Business Studies", "Accounting", "Marketing", "Finance",
                "HR Management", "Entrepreneurship",
            ],
            "engineering" => &[
                "Mechanical Engineering", "Civil Engineering", "Electrical Engineering",
                "Mechatronics", "Energy Systems",
            ],
            "science" => &[
                "Biotechnology", "Applied Science", "Pharmaceutical Science",
                "Environmental Science", "Sports Science",
            ],
            "arts" => &[
                "Digital Media", "Design", "Creative Arts", "Journalism",
                "Languages", "Social Studies",
            ],
            "health" => &[
                "Nursing", "Health Science", "Public Health",
                "Physiotherapy Studies", "Mental Health Studies",
            ],
            "computing" => &[
                "Computer Science", "Software Development", "Data Analytics",
                "Cybersecurity", "Cloud Computing",
            ],
            _ => return None,
        };
        Some(list)
    }
}
