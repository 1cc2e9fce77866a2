use clap::Parser;
use orderly::cli::{Args, run_cli};
use orderly::output::OutputFormatter;
use orderly::platform;
use orderly::prompt::StdinPrompter;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let platform = platform::current();
    let mut prompter = StdinPrompter::new();

    match run_cli(&args, platform.as_ref(), &mut prompter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
