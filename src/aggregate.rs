use tracing::debug;

use crate::models::{CourseDefinition, GradeScale, GradeSelection, GradeSummary, PriorAggregate};

/// Credit-weighted mean of grade points over graded courses with positive credits.
///
/// Ungraded courses and zero-credit courses contribute to neither sum. Returns 0
/// when nothing with positive credits is graded.
pub fn compute_weighted_average(
    selections: &GradeSelection,
    catalog: &[CourseDefinition],
    scale: &GradeScale,
) -> f64 {
    let (sum_points, sum_weight) = weighted_sums(selections, catalog, scale);
    average(sum_points, sum_weight)
}

fn average(sum_points: f64, sum_weight: f64) -> f64 {
    if sum_weight > 0.0 {
        sum_points / sum_weight
    } else {
        0.0
    }
}

/// Folds the current term into the prior aggregate.
///
/// Returns 0 until the current average is positive and the prior text parses to
/// a finite value with a positive weight.
pub fn combine_aggregate(
    current_average: f64,
    current_weight: f64,
    prior: &PriorAggregate,
) -> f64 {
    if current_average <= 0.0 {
        return 0.0;
    }

    let (Some(prior_value), Some(prior_weight)) = (prior.parsed_value(), prior.parsed_weight())
    else {
        return 0.0;
    };

    if prior_weight <= 0.0 {
        return 0.0;
    }

    let total_weight = prior_weight + current_weight;
    if total_weight <= 0.0 {
        return 0.0;
    }

    (prior_value * prior_weight + current_average * current_weight) / total_weight
}

pub fn total_credits(prior: &PriorAggregate, current_weight: f64) -> Option<f64> {
    prior.parsed_weight().map(|weight| weight + current_weight)
}

pub fn summarize(
    selections: &GradeSelection,
    catalog: &[CourseDefinition],
    scale: &GradeScale,
    current_weight: f64,
    prior: &PriorAggregate,
) -> GradeSummary {
    let (sum_points, graded_credits) = weighted_sums(selections, catalog, scale);
    let sgpa = average(sum_points, graded_credits);
    let graded_courses = catalog
        .iter()
        .filter(|course| course.credits > 0.0)
        .filter(|course| {
            selections
                .get(&course.name)
                .and_then(|grade| scale.points(grade))
                .is_some()
        })
        .count();

    GradeSummary {
        sgpa,
        current_credits: current_weight,
        cgpa: combine_aggregate(sgpa, current_weight, prior),
        total_credits: total_credits(prior, current_weight),
        graded_courses,
        graded_credits,
    }
}

fn weighted_sums(
    selections: &GradeSelection,
    catalog: &[CourseDefinition],
    scale: &GradeScale,
) -> (f64, f64) {
    let mut sum_points = 0.0;
    let mut sum_weight = 0.0;

    for course in catalog {
        if course.credits <= 0.0 {
            continue;
        }

        let Some(grade) = selections.get(&course.name) else {
            continue;
        };

        let Some(points) = scale.points(grade) else {
            debug!(course = %course.name, %grade, "grade not on scale, skipping");
            continue;
        };

        sum_points += points * course.credits;
        sum_weight += course.credits;
    }

    (sum_points, sum_weight)
}
