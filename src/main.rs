//! vsct - build editor color themes from declarative sources.

#![allow(dead_code)]

mod cli;
mod compiler;
mod config;
mod install;
mod logger;
mod orchestrator;
mod package;
mod theme;
mod utils;
mod watch;

use std::process::ExitCode;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::init(cli.log_level, cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("vsct"; "{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (config, package) = cli::common::load_project(cli)?;

    match &cli.command {
        Commands::Compile => cli::compile::compile_once(&config, &package),
        Commands::Install { silent } => cli::install::install_once(&config, &package, *silent),
        Commands::Start { args } => cli::start::start_session(args.into(), config, package),
        Commands::Dev => cli::dev::run_install_script(&config),
    }
}
