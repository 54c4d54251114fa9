//! CitiEnGov GML converter
//!
//! Translates a CitiEnGov building export, read from a file or a URL, into
//! an INSPIRE Buildings 2D or a CityGML Energy ADE document.
//!
//! ```text
//! citiengov-export --file buildings.gml buildings_citygml.gml CityGML
//! ```
//!
//! Log output goes to stderr; set `RUST_LOG` to change the level.

#![forbid(unsafe_code)]

use citiengov_gml::{SourceMode, Standard, convert};
use clap::{ArgGroup, Parser};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

/// Translate input CitiEnGov GML to a standard compliant GML
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("origin").required(true).args(["url", "file"])))]
struct Args {
    /// Set input mode to url
    #[arg(short, long)]
    url: bool,

    /// Set input mode to file
    #[arg(short, long)]
    file: bool,

    /// Path or URL of the input CitiEnGov gml to be translated
    #[arg(value_name = "INPUT")]
    input: String,

    /// Path where the output gml is written
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// The standard to make the output compliant to: INSPIRE or CityGML
    #[arg(value_name = "STANDARD")]
    standard: Standard,
}

impl Args {
    fn mode(&self) -> SourceMode {
        if self.url {
            SourceMode::Network
        } else {
            SourceMode::File
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match convert(&args.input, args.mode(), &args.output, args.standard) {
        Ok(count) => {
            info!("Wrote {} buildings to {}", count, args.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
