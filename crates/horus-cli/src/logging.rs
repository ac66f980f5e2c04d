use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::Args;

pub fn setup_logging(args: &Args) {
    let filter_level = if args.quiet {
        Level::ERROR
    } else if args.verbose >= 2 {
        Level::TRACE
    } else if args.verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(format!("horus={filter_level}"))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .without_time()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}
