use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GradeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    pub fn symbol(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Grade {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Grade::S),
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            "F" => Ok(Grade::F),
            _ => Err(GradeError::UnknownSymbol(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseKind {
    Theory,
    Lab,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDefinition {
    pub name: String,
    pub credits: f64,
    pub kind: CourseKind,
}

impl CourseDefinition {
    pub fn new(name: &str, credits: f64, kind: CourseKind) -> Self {
        Self {
            name: name.to_string(),
            credits,
            kind,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScaleVariant {
    #[default]
    Six,
    Seven,
}

impl fmt::Display for ScaleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleVariant::Six => f.write_str("six-symbol"),
            ScaleVariant::Seven => f.write_str("seven-symbol"),
        }
    }
}

/// Letter grades and their point values, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeScale {
    variant: ScaleVariant,
    entries: Vec<(Grade, f64)>,
}

impl GradeScale {
    pub fn new(variant: ScaleVariant) -> Self {
        let mut entries = vec![
            (Grade::S, 10.0),
            (Grade::A, 9.0),
            (Grade::B, 8.0),
            (Grade::C, 7.0),
            (Grade::D, 6.0),
        ];
        if variant == ScaleVariant::Seven {
            entries.push((Grade::E, 5.0));
        }
        entries.push((Grade::F, 0.0));
        Self { variant, entries }
    }

    pub fn variant(&self) -> ScaleVariant {
        self.variant
    }

    pub fn entries(&self) -> &[(Grade, f64)] {
        &self.entries
    }

    pub fn points(&self, grade: Grade) -> Option<f64> {
        self.entries
            .iter()
            .find(|(g, _)| *g == grade)
            .map(|(_, points)| *points)
    }

    /// Parses a symbol and checks it belongs to this scale.
    pub fn parse_grade(&self, symbol: &str) -> Result<Grade, GradeError> {
        let grade: Grade = symbol.parse()?;
        if self.points(grade).is_none() {
            return Err(GradeError::NotInScale {
                grade,
                variant: self.variant,
            });
        }
        Ok(grade)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkBand {
    pub grade: Grade,
    pub min: f64,
    pub range: &'static str,
    pub description: &'static str,
}

pub const MARK_BANDS: [MarkBand; 6] = [
    MarkBand {
        grade: Grade::S,
        min: 90.0,
        range: "≥ 90",
        description: "90 and above",
    },
    MarkBand {
        grade: Grade::A,
        min: 80.0,
        range: "80-89",
        description: "80 to 89",
    },
    MarkBand {
        grade: Grade::B,
        min: 70.0,
        range: "70-79",
        description: "70 to 79",
    },
    MarkBand {
        grade: Grade::C,
        min: 60.0,
        range: "60-69",
        description: "60 to 69",
    },
    MarkBand {
        grade: Grade::D,
        min: 40.0,
        range: "40-59",
        description: "40 to 59",
    },
    MarkBand {
        grade: Grade::F,
        min: 0.0,
        range: "< 40",
        description: "Less than 40",
    },
];

pub fn grade_for_marks(marks: f64) -> Result<Grade, GradeError> {
    if !marks.is_finite() || !(0.0..=100.0).contains(&marks) {
        return Err(GradeError::MarksOutOfRange(marks));
    }
    MARK_BANDS
        .iter()
        .find(|band| marks >= band.min)
        .map(|band| band.grade)
        .ok_or(GradeError::MarksOutOfRange(marks))
}

pub fn mark_band(grade: Grade) -> Option<&'static MarkBand> {
    MARK_BANDS.iter().find(|band| band.grade == grade)
}

/// Course name to optional grade. `None` marks a course as explicitly ungraded;
/// entries are overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeSelection {
    grades: BTreeMap<String, Option<Grade>>,
}

impl GradeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `grade` for `course` and returns the grade it replaced.
    pub fn set(&mut self, course: &str, grade: Option<Grade>) -> Option<Grade> {
        self.grades.insert(course.to_string(), grade).flatten()
    }

    pub fn select(&mut self, course: &str, grade: Grade) -> Option<Grade> {
        self.set(course, Some(grade))
    }

    pub fn clear(&mut self, course: &str) -> Option<Grade> {
        self.set(course, None)
    }

    pub fn get(&self, course: &str) -> Option<Grade> {
        self.grades.get(course).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<Grade>)> {
        self.grades
            .iter()
            .map(|(course, grade)| (course.as_str(), *grade))
    }

    /// Number of courses with an entry, graded or cleared.
    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn graded_count(&self) -> usize {
        self.grades.values().filter(|grade| grade.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Grade)> for GradeSelection {
    fn from_iter<T: IntoIterator<Item = (&'a str, Grade)>>(iter: T) -> Self {
        let mut selection = GradeSelection::new();
        for (course, grade) in iter {
            selection.select(course, grade);
        }
        selection
    }
}

/// Previous aggregate as typed by the user; parsed on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorAggregate {
    pub value: String,
    pub weight: String,
}

impl PriorAggregate {
    pub fn new(value: &str, weight: &str) -> Self {
        Self {
            value: value.to_string(),
            weight: weight.to_string(),
        }
    }

    pub fn parsed_value(&self) -> Option<f64> {
        parse_finite(&self.value)
    }

    pub fn parsed_weight(&self) -> Option<f64> {
        parse_finite(&self.weight)
    }
}

/// Reads the longest leading decimal number, ignoring whatever follows it.
fn parse_finite(text: &str) -> Option<f64> {
    let text = text.trim();
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 {
            mantissa_digits += frac_end - end - 1;
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_start = end + 1;
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    text[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub sgpa: f64,
    pub current_credits: f64,
    pub cgpa: f64,
    pub total_credits: Option<f64>,
    pub graded_courses: usize,
    pub graded_credits: f64,
}
