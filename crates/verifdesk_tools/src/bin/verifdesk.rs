#![forbid(unsafe_code)]

use std::env;

use chrono::Utc;
use verifdesk_tools::cli::{execute_command, parse_seed, USAGE};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return Err(USAGE.to_string());
    }
    let seed = parse_seed(env::var("VERIFDESK_SEED").ok().as_deref())?;
    let output = execute_command(&args, Utc::now().date_naive(), seed)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
