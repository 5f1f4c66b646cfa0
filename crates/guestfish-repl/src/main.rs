//! guestfish entry point.
//!
//! ```bash
//! guestfish -a disk.img -m /dev/sda        # interactive
//! guestfish -a disk.img < commands.txt     # script
//! guestfish -a disk.img launch : list-devices
//! ```

use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use guestfish_repl::Cli;

fn main() -> ExitCode {
    let cli = match Cli::try_parse_ordered() {
        Ok(cli) => cli,
        Err(e) => {
            // clap prints its own diagnostic; every flag error exits 1.
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose);

    match guestfish_repl::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("guestfish: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr. RUST_LOG is honored; each `-v` raises our own targets.
fn init_tracing(verbose: u8) {
    let mut filter = EnvFilter::from_default_env();
    let level = match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    };
    if let Some(level) = level {
        for target in ["guestfish_core", "guestfish_repl"] {
            if let Ok(directive) = format!("{target}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
