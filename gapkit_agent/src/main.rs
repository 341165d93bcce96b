use std::process::ExitCode;

fn main() -> ExitCode {
    match gapkit_agent::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
