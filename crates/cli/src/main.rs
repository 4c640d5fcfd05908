use std::process::ExitCode;

fn main() -> ExitCode {
    hrbot_cli::run()
}
