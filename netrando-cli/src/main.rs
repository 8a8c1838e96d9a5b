use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use netrando_core::{run, RandomiserSettings};

#[derive(Debug, Parser)]
#[command(name = "netrando", version, about = "Battle Network chip reward randomiser")]
struct Args {
    /// Game image to randomise.
    #[arg(long)]
    input: PathBuf,

    /// Directory the randomised image is written to.
    #[arg(long)]
    output: PathBuf,

    /// JSON profile describing the title's tables.
    #[arg(long)]
    profile: PathBuf,

    #[arg(long)]
    seed: u64,

    #[arg(long, default_value_t = false)]
    code_only: bool,

    #[arg(long, default_value_t = false)]
    use_code_mapping: bool,

    /// Skip broken table entries instead of aborting.
    #[arg(long, default_value_t = false)]
    best_effort: bool,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn init_logging(debug: bool) {
    // RUST_LOG wins over --debug when both are given.
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let settings = RandomiserSettings {
        seed: args.seed,
        code_only: args.code_only,
        use_code_mapping: args.use_code_mapping,
        best_effort: args.best_effort,
        input_path: args.input,
        output_path: args.output,
        profile_path: args.profile,
    };

    match run(settings) {
        Ok(report) => {
            info!(
                replaced = report.replaced,
                unchanged = report.unchanged,
                skipped_reassignments = report.skipped_reassignments,
                failures = report.failures,
                "done"
            );
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
