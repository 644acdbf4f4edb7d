use std::process::ExitCode;

use tracing::error;

mod app;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match app::build_app(&args) {
        Ok(wiring) => app::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            eprintln!("turf: {err}");
            ExitCode::FAILURE
        }
    }
}
