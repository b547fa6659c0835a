mod cli;

fn main() {
    // Log to stderr to keep stdout clean for issue numbers
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run() {
        eprintln!("error: {e:#}");
        std::process::exit(cli::exit_code(&e));
    }
}
