//! Binary entry point for `dualtor`.
//!
//! All logic lives in `dualtor::runner`; this file only maps failures to the
//! error exit code.

use std::{
    io::{self, Write},
    process::ExitCode,
};

fn main() -> ExitCode {
    match dualtor::run() {
        Ok(code) => code,
        Err(err) => {
            // Logging may not be set up yet, so write straight to stderr.
            writeln!(io::stderr().lock(), "dualtor: {err:#}").ok();
            ExitCode::from(dualtor::runner::EXIT_ERROR)
        }
    }
}
