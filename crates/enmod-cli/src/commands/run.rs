use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use enmod_algo::{default_registry, LpProblem};
use enmod_core::{compile, CompileOptions, Problem, ProblemSession, StepResult};
use serde::Serialize;
use tabwriter::TabWriter;
use tracing::{info, warn};

use super::{print_diagnostics, print_json};
use enmod_cli::{load_dataset, RunConfig};

#[derive(Debug, Serialize)]
struct StateValue {
    variable: String,
    value: f64,
}

#[derive(Debug, Serialize)]
struct RunReport {
    steps: Vec<StepResult>,
    total_objective: f64,
    /// Storage levels carried out of the last window
    states: Vec<StateValue>,
}

pub fn handle(
    dataset: &Path,
    config_path: Option<&Path>,
    steps: Option<usize>,
    step_hours: Option<f64>,
    start: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => RunConfig::load_from(path)?,
        None => RunConfig::default(),
    }
    .with_overrides(steps, step_hours, start)?;

    let elements = load_dataset(dataset)?;
    let options = CompileOptions {
        validate: config.validate,
        want_dependencies: false,
    };
    let out = compile(&elements, &default_registry(), options)?;
    if out.diagnostics.has_issues() && !json {
        print_diagnostics(&out.diagnostics)?;
    }
    if out.objects.is_empty() {
        warn!("{} compiled to no model objects", dataset.display());
    }

    let mut problem = LpProblem::new();
    problem.set_silent(config.solver.silent);
    problem.set_warm_start(config.solver.warm_start);

    let start = config.start_time();
    info!(
        "Running {} window(s) of {}h from {}",
        config.steps, config.step_hours, start
    );
    let mut session = ProblemSession::new(&out.objects, problem);
    let results = session.run(start, config.step_length(), config.steps)?;

    let report = RunReport {
        total_objective: results.iter().map(|r| r.objective).sum(),
        states: session
            .states()
            .iter()
            .map(|(state, value)| StateValue {
                variable: format!("{}[{}]", state.outgoing.id, state.outgoing.period),
                value: *value,
            })
            .collect(),
        steps: results,
    };
    if json {
        return print_json(&report);
    }

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "STEP\tSTART\tOBJECTIVE")?;
    for result in &report.steps {
        writeln!(writer, "{}\t{}\t{:.4}", result.step, result.start, result.objective)?;
    }
    writer.flush()?;
    println!("Total objective: {:.4}", report.total_objective);
    for state in &report.states {
        println!("  {} = {:.4}", state.variable, state.value);
    }
    Ok(())
}
