use clap::Parser;
use enmod_cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    // stdout carries tables, JSON and DOT; logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    let result = match &cli.command {
        Commands::Check { dataset, json } => commands::check::handle(dataset, *json),
        Commands::Compile {
            dataset,
            deps,
            no_validate,
            json,
        } => commands::compile::handle(dataset, *deps, !*no_validate, *json),
        Commands::Graph { dataset, format } => commands::graph::handle(dataset, *format),
        Commands::Run {
            dataset,
            config,
            steps,
            step_hours,
            start,
            json,
        } => commands::run::handle(
            dataset,
            config.as_deref(),
            *steps,
            *step_hours,
            start.as_deref(),
            *json,
        ),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
