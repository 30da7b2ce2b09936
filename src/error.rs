//! Error taxonomy
//!
//! Nothing here is fatal. Generation faults degrade the output, runtime faults are
//! rejected where they happen, and only configuration loading reaches the caller.

use thiserror::Error;

use crate::atlas::SectionId;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("area {area:?}: placed {placed} of {requested} points before the attempt guard ran out")]
    GenerationExhausted {
        area: String,
        placed: usize,
        requested: usize,
    },
    #[error("{areas} areas do not fit the {slots}-slot layout; {unplaced} left at staging position")]
    TopologyMismatch {
        areas: usize,
        slots: usize,
        unplaced: usize,
    },
    #[error("link {from:?} -> {to:?} rejected: {reason}")]
    LinkConflict {
        from: SectionId,
        to: SectionId,
        reason: &'static str,
    },
    #[error("section {0:?} has no {1} handle")]
    MissingComponent(SectionId, &'static str),
    #[error("section {0:?} is neither reachable nor visited")]
    InvalidMove(SectionId),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
