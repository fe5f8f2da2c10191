use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use boa::Interpreter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    println!(
        "Boa language interpreter v{VERSION}\n\
         Usage:\n\
         \x20 boa              Run a script from stdin\n\
         \x20 boa <file.boa>   Run a script file\n\
         \x20 boa --help       Show this help\n\
         \x20 boa --version    Show version"
    );
}

fn main() -> Result<ExitCode> {
    let mut input_path: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-v" => {
                println!("boa v{VERSION}");
                return Ok(ExitCode::SUCCESS);
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let mut interp = Interpreter::new();
    let source = match &input_path {
        Some(path) => {
            // Modules resolve next to the script being run.
            if let Some(dir) = Path::new(path).parent() {
                if !dir.as_os_str().is_empty() {
                    interp.set_base_dir(dir);
                }
            }
            fs::read_to_string(path).with_context(|| format!("Reading {path}"))?
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
    };

    match interp.run(&source) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            eprintln!("{}: {}", error.class(), error);
            Ok(ExitCode::FAILURE)
        }
    }
}
