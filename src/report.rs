use std::fmt::Write;

use chrono::NaiveDate;

use crate::catalog::Catalog;
use crate::models::{mark_band, CourseDefinition, GradeScale, GradeSelection, GradeSummary};
use crate::session::Session;

pub const SGPA_FORMULA: &str = "∑(Grade Point × Credits) / ∑(Credits)";
pub const CGPA_FORMULA: &str =
    "(Prev SGPA × Prev Credits + Current SGPA × Current Credits) / Total Credits";

/// Two-decimal display value; the underlying numbers are never rounded.
pub fn format_points(value: f64) -> String {
    format!("{value:.2}")
}

fn format_total_credits(total: Option<f64>) -> String {
    match total {
        Some(total) => format!("{total:.1}"),
        None => "-".to_string(),
    }
}

/// Result cards as shown after every change in a session.
pub fn render_results(session: &Session) -> String {
    let summary = session.summary();
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Expected SGPA: {}  (current credits {})",
        format_points(summary.sgpa),
        summary.current_credits
    );
    let _ = writeln!(
        output,
        "Expected CGPA: {}  (total credits {})",
        format_points(summary.cgpa),
        format_total_credits(summary.total_credits)
    );

    if session.editing_prior() {
        let prior = session.prior();
        let _ = writeln!(
            output,
            "Prev SGPA: {}  Prev Credits: {}",
            prior.value, prior.weight
        );
    }

    output
}

pub fn render_scale(scale: &GradeScale) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Grade scale ({}):", scale.variant());
    for (grade, points) in scale.entries() {
        match mark_band(*grade) {
            Some(band) => {
                let _ = writeln!(output, "- {grade} = {points} ({} marks)", band.range);
            }
            None => {
                let _ = writeln!(output, "- {grade} = {points}");
            }
        }
    }
    output
}

pub fn render_courses(catalog: &Catalog) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Theory courses (graded by expected marks):");
    for course in catalog.theory_courses() {
        let _ = writeln!(output, "- {} ({} credits)", course.name, course.credits);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Practical/Laboratory courses (graded by letter):");
    for course in catalog.lab_courses() {
        let _ = writeln!(output, "- {} ({} credits)", course.name, course.credits);
    }
    output
}

fn write_course_table<'a>(
    output: &mut String,
    courses: impl Iterator<Item = &'a CourseDefinition>,
    selections: &GradeSelection,
    scale: &GradeScale,
) {
    let _ = writeln!(output, "| Course | Credits | Grade | Points |");
    let _ = writeln!(output, "|---|---|---|---|");
    for course in courses {
        let grade = selections.get(&course.name);
        let points = grade.and_then(|grade| scale.points(grade));
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            course.name,
            course.credits,
            grade.map_or_else(|| "not graded".to_string(), |g| g.to_string()),
            points.map_or_else(|| "-".to_string(), |p| p.to_string()),
        );
    }
}

pub fn build_report(
    catalog: &Catalog,
    scale: &GradeScale,
    selections: &GradeSelection,
    summary: &GradeSummary,
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# SGPA & CGPA Report");
    let _ = writeln!(output, "Generated on {generated_on} ({} grade scale)", scale.variant());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Results");
    let _ = writeln!(
        output,
        "- Expected SGPA: {} (current credits {})",
        format_points(summary.sgpa),
        summary.current_credits
    );
    let _ = writeln!(
        output,
        "- Expected CGPA: {} (total credits {})",
        format_points(summary.cgpa),
        format_total_credits(summary.total_credits)
    );
    let _ = writeln!(
        output,
        "- Graded: {} courses, {} credits",
        summary.graded_courses, summary.graded_credits
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Theory Courses");
    write_course_table(&mut output, catalog.theory_courses(), selections, scale);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Practical/Laboratory Courses");
    write_course_table(&mut output, catalog.lab_courses(), selections, scale);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Scale Reference");
    for (grade, points) in scale.entries() {
        match mark_band(*grade) {
            Some(band) => {
                let _ = writeln!(output, "- {grade} = {points} ({})", band.description);
            }
            None => {
                let _ = writeln!(output, "- {grade} = {points}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Calculation Formulas");
    let _ = writeln!(output, "- SGPA = {SGPA_FORMULA}");
    let _ = writeln!(output, "- CGPA = {CGPA_FORMULA}");

    output
}
