use std::process::ExitCode;

use xmldb::ui::output;

fn main() -> ExitCode {
    match xmldb::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
