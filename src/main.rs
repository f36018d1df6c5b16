use djin::{ui, DjinError};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("DJIN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = djin::cli::run() {
        match e.downcast_ref::<DjinError>() {
            Some(error) => ui::error(error.kind(), error),
            None => ui::error("Error", &e),
        }
        process::exit(1);
    }
}
