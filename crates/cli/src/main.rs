use std::process::ExitCode;

fn main() -> ExitCode {
    quill_cli::run()
}
