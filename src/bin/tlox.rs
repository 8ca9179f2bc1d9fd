//! Command-line driver.
//!
//! When called without an argument it drops into an interactive
//! read-evaluate-print loop where errors are printed and the loop
//! continues.
//!
//! When called with a script path, it reads the file as UTF-8 and executes
//! it, exiting non-zero if the script fails to parse or raises a runtime
//! error.

use std::env;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::process;

use anyhow::Context;

use tlox::interpreter::Interpreter;

fn main() -> Result<(), anyhow::Error> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [] => run_prompt()?,
        [script] => run_file(script)?,
        _ => {
            eprintln!("Usage: tlox [script]");
            process::exit(1);
        }
    }
    Ok(())
}

fn run_file(path: &str) -> Result<(), anyhow::Error> {
    let reader =
        BufReader::new(File::open(path).with_context(|| format!("failed to open {}", path))?);

    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);

    if let Err(e) = interp.eval(reader) {
        eprintln!("{}", e);
        process::exit(1);
    }

    Ok(())
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        if let Err(e) = interp.eval(input.as_bytes()) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}
