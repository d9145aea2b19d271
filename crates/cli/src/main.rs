use std::process::ExitCode;

fn main() -> ExitCode {
    bundlekit_cli::run()
}
