use std::fmt::Display;
use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::Context as _;
use kaleidoscope_calc::backend::Backend;
use kaleidoscope_calc::config::{BackendKind, Config};
use kaleidoscope_calc::driver::{Driver, Event};
use kaleidoscope_calc::eval::Evaluator;

fn report<T: Display>(events: Vec<Event<T>>) {
    for event in events {
        match event {
            Event::Definition(out) => println!("Read function definition:\n{}\n", out),
            Event::Extern(out) => println!("Read extern:\n{}\n", out),
            Event::TopLevel(out) => println!("Read top-level expression:\n{}\n", out),
            Event::Failed(err) => eprintln!("error: {}", err),
        }
    }
}

/// What the REPL does with one line of input. Surrounding whitespace is
/// dropped before the line is compared or run.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Quit,
    Blank,
    Program(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "quit" => Input::Quit,
        "" => Input::Blank,
        program => Input::Program(program),
    }
}

fn repl<B: Backend>(driver: &mut Driver<B>, prompt: &str) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", prompt);
        stdout.flush()?;

        let line = match lines.next() {
            Some(line) => line.context("failed to read from stdin")?,
            None => break,
        };
        match classify(&line) {
            Input::Quit => break,
            Input::Blank => continue,
            Input::Program(program) => report(driver.run_program(program)),
        }
    }

    Ok(())
}

fn run<B: Backend>(config: &Config, backend: B) -> anyhow::Result<()> {
    let mut driver = Driver::new(backend);
    match &config.input {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            report(driver.run_program(&source));
            Ok(())
        }
        None => repl(&mut driver, &config.prompt),
    }
}

#[cfg(feature = "llvm")]
fn run_llvm(config: &Config) -> anyhow::Result<()> {
    let context = inkwell::context::Context::create();
    run(config, kaleidoscope_calc::codegen::Codegen::new(&context))
}

#[cfg(not(feature = "llvm"))]
fn run_llvm(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("this build has no llvm backend, rebuild with `--features llvm`")
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    match config.backend {
        BackendKind::Eval => run(&config, Evaluator::new()),
        BackendKind::Llvm => run_llvm(&config),
    }
}
