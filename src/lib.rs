use colored::Colorize;

use engine::{Engine, EngineError};
use job::Job;
use report::{Report, Verdict};

pub mod capture;
pub mod config;
pub mod diff;
pub mod engine;
pub mod job;
pub mod report;
mod runner;

/// Loads the job, runs the full check, and writes the single JSON report to
/// stdout. Failure is communicated through the report's verdict field; the
/// process exits 0 on both the normal and fatal-compile paths.
pub fn run(cli: config::Cli) -> anyhow::Result<()> {
    match cli.color.as_deref() {
        Some("on") => colored::control::set_override(true),
        Some("off") => colored::control::set_override(false),
        _ => {}
    }

    let mut job = Job::load(&cli.path)?;
    if let Some(n) = cli.iters {
        job.num_iters = n;
    }

    let report = match Engine::new().check(&job) {
        Ok(report) => report,
        // A fragment raised SystemExit; honor it instead of reporting.
        Err(EngineError::ExitRequest(status)) => std::process::exit(status),
        Err(e) => return Err(e.into()),
    };

    if cli.verbose {
        summarize(&report);
    }

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

/// Human-readable per-test summary, written to stderr so the stdout JSON
/// contract stays intact.
fn summarize(report: &Report) {
    match report {
        Report::Fatal(fatal) => {
            eprintln!(
                "{}",
                format!("compile failed in {}: {}", fatal.file, fatal.message).red()
            );
        }
        Report::Completed(run) => {
            for (i, outcome) in run.tests.iter().enumerate() {
                let n = i + 1;
                match outcome.verdict {
                    Verdict::Correct => eprintln!("{}", format!("test {n} passed").green()),
                    Verdict::Mismatch => eprintln!(
                        "{}",
                        format!(
                            "test {n} failed: {}",
                            outcome.message.as_deref().unwrap_or("output mismatch")
                        )
                        .red()
                    ),
                    _ => eprintln!(
                        "{}",
                        format!(
                            "test {n} errored: {}",
                            outcome.message.as_deref().unwrap_or("unknown error")
                        )
                        .yellow()
                    ),
                }
            }
            eprintln!("{} of {} tests correct", run.correct, run.tests.len());
        }
    }
}
