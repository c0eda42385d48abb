//! Syllabus CLI - drive the course progress engine from a terminal.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use syllabus_core::{
    builtin_course, CourseStructure, CourseStructureProvider, ModuleStatus, StaticCourse,
};
use syllabus_progress::ProgressFacade;
use syllabus_storage::{
    validate_key, JsonDirBackend, KvProgressStore, MemoryBackend, ProgressStore, StoreConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "syllabus")]
#[command(about = "Course player progress engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding progress records
    #[arg(short, long, default_value = ".syllabus")]
    data_dir: std::path::PathBuf,

    /// Prefix for every storage key
    #[arg(long, default_value = "")]
    key_prefix: String,

    /// Keep progress in memory only
    #[arg(long)]
    in_memory: bool,

    /// Print machine-readable JSON where supported
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List modules and their sections
    Modules,
    /// Show progress for the course or one module
    Status {
        /// Module ID
        module: Option<String>,
    },
    /// Mark a section as completed
    Complete {
        /// Module ID
        module: String,
        /// Section ID
        section: String,
    },
    /// Move the current position
    Goto {
        /// Module ID
        module: String,
        /// Section ID
        section: String,
    },
    /// Record an assessment result
    Quiz {
        /// Module ID
        module: String,
        /// Assessment key
        key: String,
        /// Result
        result: QuizResult,
    },
    /// Show where to continue
    Resume,
    /// Forget all progress
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum QuizResult {
    Pass,
    Fail,
}

fn open_store(cli: &Cli, course: &CourseStructure) -> Result<Box<dyn ProgressStore>> {
    let config = StoreConfig::for_course(course).with_key_prefix(cli.key_prefix.clone());
    for key in config.owned_keys() {
        if let Err(e) = validate_key(&key) {
            bail!("Invalid --key-prefix {:?}: {}", cli.key_prefix, e);
        }
    }
    if cli.in_memory {
        return Ok(Box::new(KvProgressStore::with_config(MemoryBackend::new(), config)));
    }
    let backend = JsonDirBackend::open(&cli.data_dir)?;
    Ok(Box::new(KvProgressStore::with_config(backend, config)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let course = builtin_course();
    let store = open_store(&cli, course.course_structure())?;
    let mut facade = ProgressFacade::new(course, store);
    facade.hydrate();

    match &cli.command {
        Commands::Modules => {
            for module in facade.course_structure().modules() {
                let gate = if module.is_gated() {
                    format!(" ({} required assessments)", module.assessment.len())
                } else {
                    String::new()
                };
                println!("{} - {}{}", module.id, module.title, gate);
                for section in &module.sections {
                    println!("    {} - {}", section.id, section.title);
                }
            }
        }
        Commands::Status { module } => match module {
            Some(module) => print_module(&facade, module, cli.json)?,
            None => print_course(&facade, cli.json)?,
        },
        Commands::Complete { module, section } => {
            if facade.course_structure().section(module, section).is_none() {
                bail!("Unknown section {}/{}", module, section);
            }
            if facade.mark_section_complete(module, section) {
                println!("Completed {}/{}", module, section);
            } else {
                println!("Already completed {}/{}", module, section);
            }
            print_module(&facade, module, false)?;
        }
        Commands::Goto { module, section } => {
            if !facade.set_current_position(module, section) {
                bail!("Unknown section {}/{}", module, section);
            }
            println!("Now at {}/{}", module, section);
        }
        Commands::Quiz { module, key, result } => {
            let known = facade
                .course_structure()
                .module(module)
                .is_some_and(|m| m.requires_key(key));
            if !known {
                bail!("{} is not a required assessment of {}", key, module);
            }
            let correct = matches!(result, QuizResult::Pass);
            facade.record_quiz_result(module, key, correct);
            println!(
                "Recorded {}/{} as {}",
                module,
                key,
                if correct { "passed" } else { "failed" }
            );
            print_module(&facade, module, false)?;
        }
        Commands::Resume => match facade.resume_target() {
            Some(pos) => println!("Continue at {}/{}", pos.module_id, pos.section_id),
            None => println!("Course complete"),
        },
        Commands::Reset => {
            facade.reset_progress();
            info!("Progress reset");
            println!("All progress cleared");
        }
    }

    if !facade.is_durable() {
        eprintln!("warning: progress could not be saved and will be lost on exit");
    }

    Ok(())
}

type Facade = ProgressFacade<StaticCourse, Box<dyn ProgressStore>>;

fn print_course(facade: &Facade, json: bool) -> Result<()> {
    let Some(summary) = facade.snapshot().resolved() else {
        bail!("Progress not loaded");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Course: {}% ({}/{} sections, {}/{} modules)",
        summary.course.percent(),
        summary.course.completed_sections,
        summary.course.total_sections,
        summary.course.completed_modules,
        summary.course.total_modules,
    );
    for progress in &summary.modules {
        println!(
            "  {} | {:>3}% | {}",
            progress.module_id,
            progress.percent(),
            format_status(progress.status)
        );
    }
    if let Some(pos) = &summary.current {
        println!("Current: {}/{}", pos.module_id, pos.section_id);
    }
    Ok(())
}

fn print_module(facade: &Facade, module_id: &str, json: bool) -> Result<()> {
    let Some(progress) = facade.module_progress(module_id) else {
        bail!("Unknown module {}", module_id);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
        return Ok(());
    }

    println!(
        "{}: {}% ({}/{} sections) {}",
        module_id,
        progress.percent(),
        progress.completed_sections,
        progress.total_sections,
        format_status(progress.status)
    );
    if let Some(outcome) = facade.assessment_outcome(module_id) {
        for key in &outcome.passed {
            println!("  [pass] {}", key);
        }
        for key in &outcome.failed {
            println!("  [fail] {}", key);
        }
        for key in &outcome.pending {
            println!("  [    ] {}", key);
        }
    }
    Ok(())
}

fn format_status(status: ModuleStatus) -> &'static str {
    match status {
        ModuleStatus::NotStarted => "NOT STARTED",
        ModuleStatus::InProgress => "IN PROGRESS",
        ModuleStatus::GatePending => "ASSESSMENT PENDING",
        ModuleStatus::Completed => "COMPLETED",
    }
}
