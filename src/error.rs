use thiserror::Error;

use crate::models::{Grade, ScaleVariant};

#[derive(Debug, Error, PartialEq)]
pub enum GradeError {
    #[error("unknown grade symbol `{0}`")]
    UnknownSymbol(String),

    #[error("grade {grade} is not part of the {variant} scale")]
    NotInScale { grade: Grade, variant: ScaleVariant },

    #[error("no course named `{0}` in the catalog")]
    UnknownCourse(String),

    #[error("marks must be between 0 and 100, got {0}")]
    MarksOutOfRange(f64),

    #[error("`{0}` is a lab course and is graded by letter, not by marks")]
    MarksOnLab(String),

    #[error("expected COURSE=VALUE, got `{0}`")]
    MalformedAssignment(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog has no courses")]
    Empty,

    #[error("course `{0}` appears more than once")]
    DuplicateCourse(String),

    #[error("course `{name}` has invalid credits {credits}")]
    InvalidCredits { name: String, credits: f64 },

    #[error(transparent)]
    Grade(#[from] GradeError),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
