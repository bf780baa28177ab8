use std::process::ExitCode;

fn main() -> ExitCode {
    printchat_cli::run()
}
