//! Thin CLI front-end for the mutation driver library.
//!
//! Building the original CFA from program source and wiring a concrete
//! program analysis are the embedding verifier's job (they are the CFA
//! builder and the program analyses, both explicitly out of scope for this
//! subsystem). This binary's job is the part that *is* in scope as ambient
//! wiring: load and validate a `cfaMutation.*` configuration file and
//! report the resolved settings, the way a caller embedding
//! [`cfa_mutation::MutationDriver`] would before constructing one.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cfa_mutation::DriverConfig;

#[derive(Parser, Debug)]
#[command(name = "cfa-mutate", about = "Validate and report cfaMutation.* configuration")]
struct Cli {
    /// TOML configuration file; defaults apply to anything absent.
    #[arg(long, value_name = "path")]
    config: Option<PathBuf>,

    /// Directory the driver will write per-round logs, stats, and
    /// node-rank files into.
    #[arg(long, value_name = "dir", default_value = "cfa-mutation-out")]
    out: PathBuf,
}

fn main() -> ExitCode {
    cfa_mutation::init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DriverConfig::load(path),
        None => Ok(DriverConfig::default()),
    };

    match config {
        Ok(config) => {
            tracing::info!(
                out = %cli.out.display(),
                rollbacks_in_row_check = config.rollbacks_in_row_check,
                walltime_hardcap_secs = config.walltime_hardcap.0.as_secs(),
                cex_check_secs = config.cex_check_time.0.as_secs(),
                checker = ?config.cex_checker,
                "resolved cfaMutation configuration"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(%error, "invalid cfaMutation configuration");
            ExitCode::FAILURE
        }
    }
}
