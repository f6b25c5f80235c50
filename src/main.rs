use clap::Parser;
use todoodle::cli::commands::Cli;
use todoodle::cli::handlers;

fn main() {
    // Diagnostics go to stderr; TODOODLE_LOG overrides the default level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("TODOODLE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
