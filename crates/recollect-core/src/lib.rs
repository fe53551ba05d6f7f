//! # recollect-core
//!
//! Core types, traits, and error taxonomy for recollect, a personal
//! knowledge-capture backend. This crate defines:
//!
//! - The four record kinds (Thought, Procedure+Steps, TechnicalDecision,
//!   Experience) and their create/update request shapes
//! - Repository traits implemented by `recollect-db`
//! - The shared [`Error`] taxonomy and [`Result`] alias

pub mod error;
pub mod models;
pub mod traits;

pub use error::{Error, Result};
pub use models::*;
pub use traits::{
    DecisionRepository, ExperienceRepository, ProcedureRepository, ThoughtRepository,
};
