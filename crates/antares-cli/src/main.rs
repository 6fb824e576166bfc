//! GTP front-end binary for the Antares Havannah engine

mod frontend;
mod gtp;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Parser;

use frontend::{Frontend, Outcome};

#[derive(Parser, Debug)]
#[command(author, version, about = "Havannah engine speaking a GTP v2 subset")]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = if args.debug { "debug" } else { "info" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, filter),
    );
    log::info!("Antares starting");

    let mut frontend = Frontend::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let Some(request) = gtp::parse_line(&line) else {
            continue;
        };
        match frontend.handle(&request) {
            Outcome::Reply(reply) => {
                stdout.write_all(reply.as_bytes())?;
                stdout.flush()?;
            }
            Outcome::Quit(reply) => {
                stdout.write_all(reply.as_bytes())?;
                stdout.flush()?;
                break;
            }
        }
    }
    Ok(())
}
