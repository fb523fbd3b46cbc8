//! Build script for man page generation.
//!
//! Renders `dualtor.1` with `clap_mangen` from the CLI definitions in the
//! `cli-defs` crate, which the binary also uses to load its configuration.

use std::{env, fs, io, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;
use cli_defs::Cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=cli-defs");

    let Ok(out_dir) = env::var("OUT_DIR").map(PathBuf::from) else {
        // Cargo does not set OUT_DIR for `cargo check` or IDE analysis runs.
        return Ok(());
    };
    let bin_name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "dualtor".into());

    let man = Man::new(Cli::command());
    let mut file = fs::File::create(out_dir.join(format!("{bin_name}.1")))?;
    man.render(&mut file)?;

    Ok(())
}
