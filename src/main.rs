use std::process::ExitCode;

use repolint::ui::output;

fn main() -> ExitCode {
    match repolint::cli::run() {
        Ok(code) => code,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}
