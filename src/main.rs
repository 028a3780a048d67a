use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sgpa_calculator::catalog;
use sgpa_calculator::config::Config;
use sgpa_calculator::models::{GradeScale, GradeSelection, PriorAggregate, ScaleVariant};
use sgpa_calculator::report;
use sgpa_calculator::session::{self, run as run_session, Session};

#[derive(Parser)]
#[command(name = "sgpa-calculator")]
#[command(about = "Semester and cumulative grade point average calculator", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "SGPA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute SGPA and CGPA
    Calc {
        #[command(flatten)]
        input: GradeArgs,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        input: GradeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List the courses offered for grading
    Courses {
        /// CSV catalog with name,credits,kind columns
        #[arg(long = "catalog")]
        catalog_path: Option<PathBuf>,
    },
    /// Print the grade scale reference
    Scale {
        #[arg(long, value_enum)]
        scale: Option<ScaleVariant>,
    },
    /// Edit grades interactively, recomputing after every change
    Session {
        #[command(flatten)]
        input: GradeArgs,
    },
}

#[derive(Args, Debug)]
struct GradeArgs {
    /// CSV catalog with name,credits,kind columns
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// CSV of course,grade rows applied on top of the starting grades
    #[arg(long)]
    grades: Option<PathBuf>,
    /// Letter grade for a course
    #[arg(long = "grade", value_name = "COURSE=GRADE")]
    grade: Vec<String>,
    /// Expected marks for a theory course
    #[arg(long = "marks", value_name = "COURSE=MARKS")]
    marks: Vec<String>,
    #[arg(long, value_enum)]
    scale: Option<ScaleVariant>,
    /// Previous SGPA
    #[arg(long, allow_hyphen_values = true)]
    prev_sgpa: Option<String>,
    /// Previous credits
    #[arg(long, allow_hyphen_values = true)]
    prev_credits: Option<String>,
    /// Start with no grades selected
    #[arg(long)]
    no_defaults: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Calc { input, json } => {
            let session = build_session(&config, &input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session.summary())?);
            } else {
                print!("{}", report::render_results(&session));
            }
        }
        Commands::Report { input, out } => {
            let session = build_session(&config, &input)?;
            let report = report::build_report(
                session.catalog(),
                session.scale(),
                session.selections(),
                &session.summary(),
                chrono::Local::now().date_naive(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Courses { catalog_path } => {
            let catalog = match catalog_path.as_ref().or(config.catalog.as_ref()) {
                Some(path) => catalog::load_csv(path)
                    .with_context(|| format!("failed to load catalog {}", path.display()))?,
                None => catalog::builtin(),
            };
            print!("{}", report::render_courses(&catalog));
        }
        Commands::Scale { scale } => {
            let scale = GradeScale::new(scale.unwrap_or(config.scale));
            print!("{}", report::render_scale(&scale));
        }
        Commands::Session { input } => {
            let mut session = build_session(&config, &input)?;
            run_session(&mut session, std::io::stdin().lock(), std::io::stdout().lock())?;
        }
    }

    Ok(())
}

fn build_session(config: &Config, input: &GradeArgs) -> anyhow::Result<Session> {
    let scale = GradeScale::new(input.scale.unwrap_or(config.scale));

    let (mut catalog, builtin) = match input.catalog.as_ref().or(config.catalog.as_ref()) {
        Some(path) => (
            catalog::load_csv(path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?,
            false,
        ),
        None => (catalog::builtin(), true),
    };
    if let Some(credits) = config.current_credits {
        catalog = catalog.with_current_credits(credits);
    }

    let mut selections = if builtin && config.default_grades && !input.no_defaults {
        catalog::default_selection()
    } else {
        GradeSelection::new()
    };

    if let Some(path) = &input.grades {
        let imported = catalog::import_grades(path, &catalog, &scale)
            .with_context(|| format!("failed to import grades from {}", path.display()))?;
        for (course, grade) in imported.iter() {
            selections.set(course, grade);
        }
    }

    let prior = PriorAggregate::new(
        input.prev_sgpa.as_deref().unwrap_or(&config.prev_sgpa),
        input.prev_credits.as_deref().unwrap_or(&config.prev_credits),
    );

    let mut session = Session::new(catalog, scale, selections, prior);

    for assignment in &input.grade {
        let (course, symbol) = session::parse_assignment(assignment)?;
        session
            .set_grade(course, symbol)
            .with_context(|| format!("invalid --grade {assignment}"))?;
    }

    for assignment in &input.marks {
        let (course, marks) = session::parse_assignment(assignment)?;
        let marks: f64 = marks
            .parse()
            .with_context(|| format!("invalid --marks {assignment}"))?;
        session
            .set_marks(course, marks)
            .with_context(|| format!("invalid --marks {assignment}"))?;
    }

    info!(
        courses = session.catalog().courses().len(),
        graded = session.selections().graded_count(),
        scale = %session.scale().variant(),
        "session ready"
    );

    Ok(session)
}
