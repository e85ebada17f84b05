#![allow(clippy::result_large_err)]
#![allow(dead_code)]

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use miette::Diagnostic;
use miette::Result;
use reqwest::Client;
use thiserror::Error;

use crate::asserter::AssertResult;
use crate::asserter::Asserter;
use crate::cli::Cli;
use crate::outputter::OutPutter;
use crate::regions::RegionError;
use crate::regions::RegionTable;
use crate::runner::RunnerResult;
use crate::runner::run_tests;
use crate::suite::SuiteError;
use crate::suite::build_suite;

mod asserter;
mod cli;
mod outputter;
mod regions;
mod runner;
mod suite;

#[derive(Error, Debug, Diagnostic)]
pub enum ItemProofError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    RegionError(#[from] RegionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SuiteError(#[from] SuiteError),

    #[error("Failed to build HTTP client")]
    ClientError(#[from] reqwest::Error),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let regions = RegionTable::bundled().map_err(ItemProofError::RegionError)?;
    regions
        .check(&cli.region)
        .map_err(ItemProofError::RegionError)?;

    let mut tests =
        build_suite(&cli.region, cli.api_key.as_deref(), &regions).map_err(ItemProofError::SuiteError)?;

    if let Some(filter) = &cli.filter {
        tests.retain(|test| test.name.contains(filter.as_str()));
    }
    let n_tests = tests.len();

    let client = Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs))
        .build()
        .map_err(ItemProofError::ClientError)?;

    let (runner_tx, asserter_rx) = flume::unbounded::<RunnerResult>();
    let (asserter_tx, outputter_rx) =
        flume::unbounded::<(String, String, String, Arc<[AssertResult]>)>();

    // Outputter Task
    let region = cli.region.clone();
    let outputter_handle =
        tokio::spawn(async move { OutPutter::start(outputter_rx, &region, n_tests).await });

    // TestRunner Task
    let runner_jh = tokio::spawn(async move { run_tests(tests, client, runner_tx).await });

    // Asserter Task
    let asserter_jh = tokio::spawn(async move { Asserter::run(asserter_rx, asserter_tx).await });

    let (runner_res, asserter_res, failed) =
        futures::join!(runner_jh, asserter_jh, outputter_handle);

    // A panicked or aborted stage counts as a failed run
    let run_ok = matches!(runner_res, Ok(Ok(())));
    let assert_ok = matches!(asserter_res, Ok(Ok(())));
    let failed = failed.unwrap_or(n_tests.max(1));

    if failed == 0 && run_ok && assert_ok {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
