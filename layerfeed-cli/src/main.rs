//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use layerfeed_cli::CliError;

fn main() {
    if let Err(err) = layerfeed_cli::init_logging() {
        eprintln!("layerfeed: {err}");
    }
    match layerfeed_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("layerfeed: {err}");
            std::process::exit(1);
        }
    }
}
