//! Synthetic higher-education cohort generator.
//!
//! Produces a programme catalog, a student population, and a multi-year
//! simulation of enrolment and academic performance, with deliberate
//! source-system noise layered on top. See `pipeline::generate`.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod imperfection;
pub mod model;
pub mod name_bank;
pub mod pipeline;
pub mod population;
pub mod records;
pub mod report;
pub mod rng;
pub mod state;
pub mod types;
