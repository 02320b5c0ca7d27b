use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let verbose = env::args().skip(1).any(|a| a == "-v" || a == "--verbose");
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    encore::runtime::run()
}
