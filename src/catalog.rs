use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{CatalogError, GradeError};
use crate::models::{CourseDefinition, CourseKind, Grade, GradeScale, GradeSelection};

/// Courses of one term plus the credit total used when folding into a CGPA.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    courses: Vec<CourseDefinition>,
    current_credits: f64,
}

impl Catalog {
    pub fn new(courses: Vec<CourseDefinition>) -> Result<Self, CatalogError> {
        if courses.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for course in &courses {
            if !course.credits.is_finite() || course.credits < 0.0 {
                return Err(CatalogError::InvalidCredits {
                    name: course.name.clone(),
                    credits: course.credits,
                });
            }
            if !seen.insert(course.name.as_str()) {
                return Err(CatalogError::DuplicateCourse(course.name.clone()));
            }
        }

        let current_credits = courses
            .iter()
            .filter(|course| course.credits > 0.0)
            .map(|course| course.credits)
            .sum();

        Ok(Self {
            courses,
            current_credits,
        })
    }

    pub fn with_current_credits(mut self, credits: f64) -> Self {
        self.current_credits = credits;
        self
    }

    pub fn courses(&self) -> &[CourseDefinition] {
        &self.courses
    }

    pub fn current_credits(&self) -> f64 {
        self.current_credits
    }

    pub fn find(&self, name: &str) -> Result<&CourseDefinition, GradeError> {
        self.courses
            .iter()
            .find(|course| course.name == name)
            .ok_or_else(|| GradeError::UnknownCourse(name.to_string()))
    }

    /// Theory courses offered for grading; zero-credit theory courses are left out.
    pub fn theory_courses(&self) -> impl Iterator<Item = &CourseDefinition> {
        self.courses
            .iter()
            .filter(|course| course.kind == CourseKind::Theory && course.credits > 0.0)
    }

    pub fn lab_courses(&self) -> impl Iterator<Item = &CourseDefinition> {
        self.courses
            .iter()
            .filter(|course| course.kind == CourseKind::Lab)
    }
}

/// II-SEM catalog for CSM students.
pub fn builtin() -> Catalog {
    let courses = vec![
        CourseDefinition::new("Environmental Sciences", 0.0, CourseKind::Theory),
        CourseDefinition::new(
            "Essence of Indian Traditional Knowledge",
            0.0,
            CourseKind::Theory,
        ),
        CourseDefinition::new("English", 2.0, CourseKind::Theory),
        CourseDefinition::new("Chemistry", 4.0, CourseKind::Theory),
        CourseDefinition::new(
            "Differential Equations & Numerical Methods",
            4.0,
            CourseKind::Theory,
        ),
        CourseDefinition::new("Scientific Programming", 3.0, CourseKind::Theory),
        CourseDefinition::new("English Lab", 1.0, CourseKind::Lab),
        CourseDefinition::new("Chemistry Lab", 1.5, CourseKind::Lab),
        CourseDefinition::new("Workshop Practice", 3.0, CourseKind::Lab),
        CourseDefinition::new("Scientific Programming Lab", 1.0, CourseKind::Lab),
    ];

    Catalog {
        courses,
        current_credits: 19.5,
    }
}

pub fn default_selection() -> GradeSelection {
    [
        ("English", Grade::B),
        ("Chemistry", Grade::A),
        ("Scientific Programming", Grade::A),
        ("Differential Equations & Numerical Methods", Grade::C),
        ("English Lab", Grade::A),
        ("Chemistry Lab", Grade::A),
        ("Workshop Practice", Grade::A),
        ("Scientific Programming Lab", Grade::A),
    ]
    .into_iter()
    .collect()
}

pub fn load_csv(csv_path: &Path) -> Result<Catalog, CatalogError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    read_catalog(reader)
}

fn read_catalog<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Catalog, CatalogError> {
    let mut courses = Vec::new();
    for result in reader.deserialize::<CourseDefinition>() {
        courses.push(result?);
    }
    debug!(courses = courses.len(), "catalog rows read");
    Catalog::new(courses)
}

pub fn import_grades(
    csv_path: &Path,
    catalog: &Catalog,
    scale: &GradeScale,
) -> Result<GradeSelection, CatalogError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    read_grades(reader, catalog, scale)
}

fn read_grades<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    catalog: &Catalog,
    scale: &GradeScale,
) -> Result<GradeSelection, CatalogError> {
    #[derive(Deserialize)]
    struct CsvRow {
        course: String,
        grade: Option<String>,
    }

    let mut selection = GradeSelection::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let course = catalog.find(&row.course)?;
        match row.grade.filter(|symbol| !symbol.is_empty()) {
            Some(symbol) => {
                let grade = scale.parse_grade(&symbol)?;
                selection.select(&course.name, grade);
            }
            None => {
                selection.clear(&course.name);
            }
        }
    }

    debug!(
        rows = selection.len(),
        graded = selection.graded_count(),
        "grades imported"
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScaleVariant;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes())
    }

    #[test]
    fn builtin_credits_match_positive_sum() {
        let catalog = builtin();
        assert_eq!(catalog.courses().len(), 10);
        assert_eq!(catalog.current_credits(), 19.5);
        let rebuilt = Catalog::new(catalog.courses().to_vec()).unwrap();
        assert_eq!(rebuilt.current_credits(), 19.5);
    }

    #[test]
    fn form_views_hide_zero_credit_theory() {
        let catalog = builtin();
        let theory: Vec<&str> = catalog.theory_courses().map(|c| c.name.as_str()).collect();
        assert_eq!(
            theory,
            vec![
                "English",
                "Chemistry",
                "Differential Equations & Numerical Methods",
                "Scientific Programming"
            ]
        );
        assert_eq!(catalog.lab_courses().count(), 4);
    }

    #[test]
    fn default_selection_covers_graded_courses() {
        let catalog = builtin();
        let selection = default_selection();
        assert_eq!(selection.len(), 8);
        for course in catalog.theory_courses().chain(catalog.lab_courses()) {
            assert!(selection.get(&course.name).is_some(), "{}", course.name);
        }
    }

    #[test]
    fn reads_catalog_rows() {
        let catalog = read_catalog(reader(
            "name,credits,kind\nAlgebra, 4, theory\nPhysics Lab,1.5,lab\nYoga,0,theory\n",
        ))
        .unwrap();
        assert_eq!(catalog.courses().len(), 3);
        assert_eq!(catalog.courses()[1].kind, CourseKind::Lab);
        assert_eq!(catalog.current_credits(), 5.5);
    }

    #[test]
    fn rejects_invalid_catalogs() {
        assert!(matches!(
            read_catalog(reader("name,credits,kind\n")),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            read_catalog(reader("name,credits,kind\nA,1,lab\nA,2,theory\n")),
            Err(CatalogError::DuplicateCourse(name)) if name == "A"
        ));
        assert!(matches!(
            read_catalog(reader("name,credits,kind\nA,-1,lab\n")),
            Err(CatalogError::InvalidCredits { .. })
        ));
        assert!(matches!(
            read_catalog(reader("name,credits,kind\nA,1,seminar\n")),
            Err(CatalogError::Csv(_))
        ));
    }

    #[test]
    fn imports_grades_and_clears_blank_cells() {
        let scale = GradeScale::new(ScaleVariant::Six);
        let selection = read_grades(
            reader("course,grade\nEnglish,s\nChemistry,\nWorkshop Practice,B\n"),
            &builtin(),
            &scale,
        )
        .unwrap();
        assert_eq!(selection.len(), 3);
        assert_eq!(selection.graded_count(), 2);
        assert_eq!(selection.get("English"), Some(Grade::S));
        assert_eq!(selection.get("Chemistry"), None);
        assert!(selection.iter().any(|entry| entry == ("Chemistry", None)));
    }

    #[test]
    fn grade_import_rejects_unknown_courses_and_symbols() {
        let scale = GradeScale::new(ScaleVariant::Six);
        assert!(matches!(
            read_grades(reader("course,grade\nHistory,A\n"), &builtin(), &scale),
            Err(CatalogError::Grade(GradeError::UnknownCourse(_)))
        ));
        assert!(matches!(
            read_grades(reader("course,grade\nEnglish,E\n"), &builtin(), &scale),
            Err(CatalogError::Grade(GradeError::NotInScale { .. }))
        ));
    }
}
