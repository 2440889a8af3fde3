use std::process::ExitCode;

fn main() -> ExitCode {
    match divacat::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(?err, "divacat exited with an error");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
