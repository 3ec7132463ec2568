use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{crate_version, App, Arg};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BackendKind {
    Eval,
    Llvm,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eval" => Ok(BackendKind::Eval),
            "llvm" => Ok(BackendKind::Llvm),
            other => Err(format!("unknown backend {}", other)),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    /// program file; the REPL reads stdin when absent
    pub input: Option<PathBuf>,
    pub backend: BackendKind,
    pub prompt: String,
}

fn app() -> App<'static, 'static> {
    App::new("kaleidoscope-calc")
        .version(crate_version!())
        .about("the kaleidoscope calculator language compiler front end")
        .arg(
            Arg::with_name("FILE")
                .help("program to run line by line instead of reading stdin")
                .index(1),
        )
        .arg(
            Arg::with_name("backend")
                .long("backend")
                .short("b")
                .takes_value(true)
                .possible_values(&["eval", "llvm"])
                .default_value("eval")
                .help("what to hand parsed constructs to"),
        )
        .arg(
            Arg::with_name("prompt")
                .long("prompt")
                .takes_value(true)
                .default_value("ready> ")
                .help("REPL prompt"),
        )
}

impl Config {
    pub fn from_args() -> Self {
        Self::from_matches(&app().get_matches())
    }

    pub fn parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&app().get_matches_from_safe(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Config {
            input: matches.value_of_os("FILE").map(PathBuf::from),
            // possible_values already rejected anything else
            backend: matches
                .value_of("backend")
                .and_then(|s| s.parse().ok())
                .unwrap_or(BackendKind::Eval),
            prompt: matches.value_of("prompt").unwrap_or("ready> ").to_string(),
        }
    }
}
