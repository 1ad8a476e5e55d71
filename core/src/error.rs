use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown programme '{programme_id}'")]
    UnknownProgramme { programme_id: String },

    #[error("Unknown student '{student_id}'")]
    UnknownStudent { student_id: String },

    #[error("Student '{student_id}' admitted as an entrant more than once")]
    DuplicateEntrant { student_id: String },

    #[error("Invalid date of birth {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
