use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    pkg::{
        az::{runner::AzCli, Scope},
        conf::settings,
        orchestrator::RouteOrchestrator,
        spec::config::FrontDoorConf,
    },
    prelude::Result,
};

#[derive(Parser, Debug)]
#[command(about = "provisions front door frontends, pools, routing rules and rules engines")]
struct Cmd {
    /// Path to the route configuration
    #[arg(long, default_value = "FrontdoorMiscRoutes.cfg")]
    config: PathBuf,
    /// Echo every command before it runs
    #[arg(long)]
    verbose: bool,
    /// Also print what every command returned
    #[arg(long)]
    veryverbose: bool,
    /// Print the commands that would change anything instead of running them
    #[arg(long)]
    whatif: bool,
}

impl Cmd {
    fn log_level(&self) -> &'static str {
        if self.veryverbose {
            "trace"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

pub async fn run() -> Result<ExitCode> {
    let args = Cmd::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .init();

    let conf = match FrontDoorConf::load(&args.config)? {
        Some(conf) => conf,
        None => {
            tracing::info!("config {} not found, clean exit", args.config.display());
            return Ok(ExitCode::SUCCESS);
        }
    };

    let runner = AzCli::new(&settings)?;
    let scope = Scope::new(&conf.front_door_name, &conf.front_door_group);
    let report = RouteOrchestrator::new(&runner, scope, (*settings).clone(), args.whatif)
        .run(&conf)
        .await?;
    for failure in &report.failures {
        tracing::error!("{}", failure);
    }
    Ok(ExitCode::from(report.exit_code()))
}
