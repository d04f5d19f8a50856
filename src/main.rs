use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use log::debug;

use ids_route_verifier::config::VerifierConfig;
use ids_route_verifier::net::io;
use ids_route_verifier::options::Options;
use ids_route_verifier::verify::{VerificationRequest, Verifier};

fn main() -> ExitCode {
    if std::env::var("RV_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("RV_LOG")
            .write_style("RV_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// 返回是否所有规则都成立.
fn run() -> Result<bool> {
    let mut flags = shellwords::split(&std::env::var("RV_FLAGS").unwrap_or_default())
        .context("RV_FLAGS has mismatched quotes")?;
    flags.extend(std::env::args().skip(1));

    let options = match Options::parse_from_args(&flags) {
        Ok(options) => options,
        Err(err) => match err.downcast::<clap::Error>() {
            Ok(clap_err) => clap_err.exit(),
            Err(other) => return Err(anyhow!("{other}")),
        },
    };
    debug!("RV options: {:?}", options);

    let config = VerifierConfig::load_from_file(&options.config)?;
    let request: VerificationRequest = io::read_document(&options.input)
        .with_context(|| format!("Failed to read request: {:?}", options.input))?;
    let verifier = Verifier::new(config);

    let analysis = verifier.analyse(&request.route)?;
    if let Some(path) = &options.dot {
        analysis
            .net()
            .write_dot(path)
            .with_context(|| format!("Failed to write {:?}", path))?;
    }
    if let Some(path) = &options.step_dot {
        let (steps, _) = analysis
            .state_space
            .as_ref()
            .map_err(|err| anyhow!("no step graph for {}: {err}", request.route.id))?;
        steps
            .write_dot(path)
            .with_context(|| format!("Failed to write {:?}", path))?;
    }

    let report = verifier.verify_analysed(analysis, &request.resources);
    print!("{report}");
    if let Some(path) = &options.output {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
    }
    Ok(report.is_compliant())
}
