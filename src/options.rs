//! Parsing Options.
//! `--input {file}` or `-i`, a JSON or RON verification request

use clap::{Arg, Command};
use std::error::Error;
use std::path::PathBuf;

fn make_options_parser() -> clap::Command {
    Command::new("route-verifier")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Checks usage-control policies against application data-flow routes")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Verification request: a route and the resources it carries")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML file with exploration bounds and duty tags")
                .default_value("route-verifier.toml"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path to file where the JSON report will be stored"),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the route net as a DOT graph"),
        )
        .arg(
            Arg::new("step-dot")
                .long("step-dot")
                .value_name("FILE")
                .help("Write the step graph as a DOT graph"),
        )
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub input: PathBuf,
    pub config: PathBuf,
    pub output: Option<PathBuf>,
    pub dot: Option<PathBuf>,
    pub step_dot: Option<PathBuf>,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        let path = |id: &str| matches.get_one::<String>(id).map(PathBuf::from);

        let input = path("input").ok_or("missing --input")?;
        let config = path("config").unwrap_or_default();
        Ok(Options {
            input,
            config,
            output: path("output"),
            dot: path("dot"),
            step_dot: path("step-dot"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_str() {
        let options =
            Options::parse_from_str("-i request.json -o 'out dir/report.json' --dot net.dot").unwrap();
        assert_eq!(options.input, PathBuf::from("request.json"));
        assert_eq!(options.config, PathBuf::from("route-verifier.toml"));
        assert_eq!(options.output, Some(PathBuf::from("out dir/report.json")));
        assert_eq!(options.dot, Some(PathBuf::from("net.dot")));
        assert_eq!(options.step_dot, None);
    }

    #[test]
    fn test_parse_from_args_err() {
        let options = Options::parse_from_args(&["-o".to_owned(), "report.json".to_owned()]);
        assert!(options.is_err());

        let options = Options::parse_from_args(&["-k".to_owned(), "deadlock".to_owned()]);
        assert!(options.is_err());
    }

    #[test]
    fn test_parse_from_str_err() {
        assert!(Options::parse_from_str("-i 'unterminated").is_err());
    }
}
