use std::process::ExitCode;

use translineage::ui::output;

fn main() -> ExitCode {
    match translineage::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
