mod app;
mod cli;

use tracing::Level;

fn init_logging(verbose: bool) {
    let level = if verbose || cfg!(feature = "dev-logging") {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = cli::parse();
    init_logging(cli.verbose);
    app::run(cli);
}
