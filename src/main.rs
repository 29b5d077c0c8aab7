use std::process::ExitCode;

fn main() -> ExitCode {
    match smartc::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("smartc: {e:#}");
            ExitCode::FAILURE
        }
    }
}
