//! fsim command-line entry point

use std::process::ExitCode;

use anyhow::Context;
use fsim_manager::{construct_argparser, ErrorKind, ExecutionContext, ManagerArgs, TaskRegistry};
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,fsim_manager=info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(args: &ManagerArgs) -> anyhow::Result<()> {
    let ctx = ExecutionContext::from_env().context("failed to determine the working directory")?;
    let registry = TaskRegistry::with_defaults();
    fsim_manager::main(args, &ctx, &registry)?;
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let matches = match construct_argparser().try_get_matches_from(std::env::args_os()) {
        Ok(matches) => matches,
        Err(err) => err.exit(),
    };
    let args = match ManagerArgs::from_matches(&matches) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let usage = err
                .downcast_ref::<fsim_manager::ManagerError>()
                .is_some_and(|e| e.kind() == ErrorKind::Usage);
            ExitCode::from(if usage { 2 } else { 1 })
        }
    }
}
