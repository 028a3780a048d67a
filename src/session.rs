//! Interactive grading session.
//!
//! Holds the editable state of one run (grade selection, prior aggregate, the
//! prior-editor flag) and keeps SGPA and CGPA current: every mutating call
//! recomputes the values that depend on what it changed.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate;
use crate::catalog::Catalog;
use crate::error::GradeError;
use crate::models::{
    grade_for_marks, CourseKind, Grade, GradeScale, GradeSelection, GradeSummary, PriorAggregate,
};
use crate::report;

#[derive(Debug, Clone)]
pub struct Session {
    catalog: Catalog,
    scale: GradeScale,
    selections: GradeSelection,
    prior: PriorAggregate,
    sgpa: f64,
    cgpa: f64,
    editing_prior: bool,
}

impl Session {
    pub fn new(
        catalog: Catalog,
        scale: GradeScale,
        selections: GradeSelection,
        prior: PriorAggregate,
    ) -> Self {
        let mut session = Self {
            catalog,
            scale,
            selections,
            prior,
            sgpa: 0.0,
            cgpa: 0.0,
            editing_prior: false,
        };
        session.recompute_sgpa();
        session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scale(&self) -> &GradeScale {
        &self.scale
    }

    pub fn selections(&self) -> &GradeSelection {
        &self.selections
    }

    pub fn prior(&self) -> &PriorAggregate {
        &self.prior
    }

    pub fn sgpa(&self) -> f64 {
        self.sgpa
    }

    pub fn cgpa(&self) -> f64 {
        self.cgpa
    }

    pub fn editing_prior(&self) -> bool {
        self.editing_prior
    }

    pub fn summary(&self) -> GradeSummary {
        aggregate::summarize(
            &self.selections,
            self.catalog.courses(),
            &self.scale,
            self.catalog.current_credits(),
            &self.prior,
        )
    }

    /// Selects a letter grade. An empty symbol or `-` puts the course back to ungraded.
    pub fn set_grade(&mut self, course: &str, symbol: &str) -> Result<Option<Grade>, GradeError> {
        let name = self.catalog.find(course)?.name.clone();
        let grade = match symbol.trim() {
            "" | "-" => None,
            symbol => Some(self.scale.parse_grade(symbol)?),
        };
        self.select(&name, grade);
        Ok(grade)
    }

    pub fn clear_grade(&mut self, course: &str) -> Result<(), GradeError> {
        let name = self.catalog.find(course)?.name.clone();
        self.select(&name, None);
        Ok(())
    }

    /// Grades a theory course by its expected marks.
    pub fn set_marks(&mut self, course: &str, marks: f64) -> Result<Grade, GradeError> {
        let definition = self.catalog.find(course)?;
        if definition.kind == CourseKind::Lab {
            return Err(GradeError::MarksOnLab(definition.name.clone()));
        }
        let name = definition.name.clone();
        let grade = grade_for_marks(marks)?;
        self.select(&name, Some(grade));
        Ok(grade)
    }

    pub fn set_prior_value(&mut self, text: &str) {
        self.prior.value = text.trim().to_string();
        self.recompute_cgpa();
        info!(prior_value = %self.prior.value, cgpa = self.cgpa, "prior value updated");
    }

    pub fn set_prior_weight(&mut self, text: &str) {
        self.prior.weight = text.trim().to_string();
        self.recompute_cgpa();
        info!(prior_weight = %self.prior.weight, cgpa = self.cgpa, "prior weight updated");
    }

    /// Shows or hides the prior aggregate editor. Returns the new state.
    pub fn toggle_prior_editor(&mut self) -> bool {
        self.editing_prior = !self.editing_prior;
        self.editing_prior
    }

    pub fn apply(&mut self, command: &Command) -> Result<(), CommandError> {
        match command {
            Command::Grade { course, symbol } => {
                self.set_grade(course, symbol)?;
            }
            Command::Marks { course, marks } => {
                self.set_marks(course, *marks)?;
            }
            Command::Clear { course } => self.clear_grade(course)?,
            Command::PrevSgpa(text) => self.set_prior_value(text),
            Command::PrevCredits(text) => self.set_prior_weight(text),
            Command::Edit => {
                self.toggle_prior_editor();
            }
            Command::Show | Command::Help | Command::Quit => {}
        }
        Ok(())
    }

    fn select(&mut self, course: &str, grade: Option<Grade>) {
        self.selections.set(course, grade);
        self.recompute_sgpa();
        match grade {
            Some(grade) => {
                info!(course, %grade, sgpa = self.sgpa, cgpa = self.cgpa, "grade selected")
            }
            None => info!(course, sgpa = self.sgpa, cgpa = self.cgpa, "grade cleared"),
        }
    }

    fn recompute_sgpa(&mut self) {
        self.sgpa =
            aggregate::compute_weighted_average(&self.selections, self.catalog.courses(), &self.scale);
        self.recompute_cgpa();
    }

    fn recompute_cgpa(&mut self) {
        self.cgpa =
            aggregate::combine_aggregate(self.sgpa, self.catalog.current_credits(), &self.prior);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Grade { course: String, symbol: String },
    Marks { course: String, marks: f64 },
    Clear { course: String },
    PrevSgpa(String),
    PrevCredits(String),
    Edit,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("marks must be a number, got `{0}`")]
    InvalidMarks(String),

    #[error(transparent)]
    Grade(#[from] GradeError),
}

pub const HELP: &str = "\
commands:
  grade COURSE=GRADE   select a letter grade
  marks COURSE=MARKS   grade a theory course by expected marks
  clear COURSE         mark a course as ungraded (same as grade COURSE=)
  prev-sgpa VALUE      set the previous SGPA
  prev-credits VALUE   set the previous credits
  edit                 show or hide the previous SGPA editor
  show                 print the current results
  help                 print this help
  quit                 leave the session";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };

        match keyword {
            "grade" => {
                let (course, symbol) = parse_assignment(rest)?;
                Ok(Command::Grade {
                    course: course.to_string(),
                    symbol: symbol.to_string(),
                })
            }
            "marks" => {
                let (course, marks) = parse_assignment(rest)?;
                let marks = marks
                    .parse::<f64>()
                    .map_err(|_| CommandError::InvalidMarks(marks.to_string()))?;
                Ok(Command::Marks {
                    course: course.to_string(),
                    marks,
                })
            }
            "clear" => Ok(Command::Clear {
                course: required(rest, "clear")?,
            }),
            "prev-sgpa" => Ok(Command::PrevSgpa(required(rest, "prev-sgpa")?)),
            "prev-credits" => Ok(Command::PrevCredits(required(rest, "prev-credits")?)),
            "edit" => Ok(Command::Edit),
            "show" | "" => Ok(Command::Show),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn required(rest: &str, command: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    Ok(rest.to_string())
}

/// Splits `COURSE=VALUE` at the last `=`; course names may contain spaces and
/// the value may be empty.
pub fn parse_assignment(text: &str) -> Result<(&str, &str), GradeError> {
    let (course, value) = text
        .rsplit_once('=')
        .ok_or_else(|| GradeError::MalformedAssignment(text.to_string()))?;
    let course = course.trim();
    if course.is_empty() {
        return Err(GradeError::MalformedAssignment(text.to_string()));
    }
    Ok((course, value.trim()))
}

/// Reads commands line by line until `quit` or end of input, printing the
/// results after every accepted change.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: R, mut output: W) -> io::Result<()> {
    write!(output, "{}", report::render_courses(session.catalog()))?;
    writeln!(output)?;
    write!(output, "{}", report::render_results(session))?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                warn!(line = line.trim(), "rejected command");
                writeln!(output, "error: {err}")?;
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => writeln!(output, "{HELP}")?,
            command => match session.apply(&command) {
                Ok(()) => write!(output, "{}", report::render_results(session))?,
                Err(err) => {
                    warn!(?command, "command failed");
                    writeln!(output, "error: {err}")?;
                }
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::models::ScaleVariant;

    fn session(selections: GradeSelection) -> Session {
        Session::new(
            catalog::builtin(),
            GradeScale::new(ScaleVariant::Six),
            selections,
            PriorAggregate::new("7.64", "21"),
        )
    }

    #[test]
    fn starts_with_computed_results() {
        let session = session(catalog::default_selection());
        assert!((session.sgpa() - 165.5 / 19.5).abs() < 1e-9);
        assert!(session.cgpa() > 0.0);
    }

    #[test]
    fn empty_selection_shows_zero() {
        let session = session(GradeSelection::new());
        assert_eq!(session.sgpa(), 0.0);
        assert_eq!(session.cgpa(), 0.0);
    }

    #[test]
    fn grade_change_recomputes_both_values() {
        let mut session = session(GradeSelection::new());
        assert_eq!(session.set_grade("English", "s"), Ok(Some(Grade::S)));
        assert_eq!(session.sgpa(), 10.0);
        let expected = (7.64 * 21.0 + 10.0 * 19.5) / 40.5;
        assert_eq!(session.cgpa(), expected);
    }

    #[test]
    fn prior_change_recomputes_cgpa_only() {
        let mut session = session(catalog::default_selection());
        let sgpa = session.sgpa();
        session.set_prior_weight("abc");
        assert_eq!(session.sgpa(), sgpa);
        assert_eq!(session.cgpa(), 0.0);
        session.set_prior_weight(" 21 ");
        assert_eq!(session.prior().weight, "21");
        assert!(session.cgpa() > 0.0);
    }

    #[test]
    fn rejects_unknown_course_and_off_scale_grade() {
        let mut session = session(GradeSelection::new());
        assert_eq!(
            session.set_grade("History", "A"),
            Err(GradeError::UnknownCourse("History".to_string()))
        );
        assert!(matches!(
            session.set_grade("English", "E"),
            Err(GradeError::NotInScale { .. })
        ));
        assert!(session.selections().is_empty());
    }

    #[test]
    fn clearing_a_course_returns_it_to_ungraded() {
        let selections: GradeSelection = [
            ("English", Grade::B),
            ("Chemistry", Grade::S),
            ("Workshop Practice", Grade::C),
        ]
        .into_iter()
        .collect();
        let mut session = session(selections);
        assert_eq!(session.summary().graded_courses, 3);

        assert_eq!(session.set_grade("English", ""), Ok(None));
        let summary = session.summary();
        assert_eq!(summary.graded_courses, 2);
        assert_eq!(summary.graded_credits, 7.0);
        let expected = (10.0 * 4.0 + 7.0 * 3.0) / 7.0;
        assert!((session.sgpa() - expected).abs() < 1e-12);
        assert_eq!(session.selections().len(), 3);

        session.apply(&"clear Chemistry".parse().unwrap()).unwrap();
        assert_eq!(session.summary().graded_courses, 1);
        assert_eq!(session.sgpa(), 7.0);

        assert_eq!(session.set_grade("Workshop Practice", " - "), Ok(None));
        assert_eq!(session.sgpa(), 0.0);
        assert_eq!(session.cgpa(), 0.0);
        assert_eq!(
            session.clear_grade("History"),
            Err(GradeError::UnknownCourse("History".to_string()))
        );
    }

    #[test]
    fn marks_only_grade_theory_courses() {
        let mut session = session(GradeSelection::new());
        assert_eq!(session.set_marks("Chemistry", 84.0), Ok(Grade::A));
        assert_eq!(session.selections().get("Chemistry"), Some(Grade::A));
        assert_eq!(
            session.set_marks("Chemistry Lab", 84.0),
            Err(GradeError::MarksOnLab("Chemistry Lab".to_string()))
        );
        assert_eq!(
            session.set_marks("Chemistry", 120.0),
            Err(GradeError::MarksOutOfRange(120.0))
        );
    }

    #[test]
    fn editor_toggle_leaves_results_alone() {
        let mut session = session(catalog::default_selection());
        let (sgpa, cgpa) = (session.sgpa(), session.cgpa());
        assert!(session.toggle_prior_editor());
        assert!(!session.toggle_prior_editor());
        assert_eq!((session.sgpa(), session.cgpa()), (sgpa, cgpa));
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "grade Differential Equations & Numerical Methods = b".parse::<Command>(),
            Ok(Command::Grade {
                course: "Differential Equations & Numerical Methods".to_string(),
                symbol: "b".to_string(),
            })
        );
        assert_eq!(
            "marks English=91".parse::<Command>(),
            Ok(Command::Marks {
                course: "English".to_string(),
                marks: 91.0,
            })
        );
        assert_eq!(
            "prev-sgpa 8.1".parse::<Command>(),
            Ok(Command::PrevSgpa("8.1".to_string()))
        );
        assert_eq!("".parse::<Command>(), Ok(Command::Show));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Quit));
        assert_eq!(
            "prev-credits".parse::<Command>(),
            Err(CommandError::MissingArgument("prev-credits"))
        );
        assert_eq!(
            "marks English=lots".parse::<Command>(),
            Err(CommandError::InvalidMarks("lots".to_string()))
        );
        assert_eq!(
            "grade English=".parse::<Command>(),
            Ok(Command::Grade {
                course: "English".to_string(),
                symbol: String::new(),
            })
        );
        assert_eq!(
            "clear Chemistry Lab".parse::<Command>(),
            Ok(Command::Clear {
                course: "Chemistry Lab".to_string(),
            })
        );
        assert_eq!(
            "clear".parse::<Command>(),
            Err(CommandError::MissingArgument("clear"))
        );
        assert_eq!(
            "grade =A".parse::<Command>(),
            Err(CommandError::Grade(GradeError::MalformedAssignment(
                "=A".to_string()
            )))
        );
        assert_eq!(
            "grade English".parse::<Command>(),
            Err(CommandError::Grade(GradeError::MalformedAssignment(
                "English".to_string()
            )))
        );
        assert_eq!(
            "dance".parse::<Command>(),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn apply_routes_commands() {
        let mut session = session(GradeSelection::new());
        session
            .apply(&"grade Workshop Practice=A".parse().unwrap())
            .unwrap();
        assert_eq!(session.sgpa(), 9.0);
        session.apply(&Command::Edit).unwrap();
        assert!(session.editing_prior());
        assert!(session.apply(&"grade Nope=A".parse().unwrap()).is_err());
    }
}
