//! Document analysis and URL investigation commands.
//!
//! This is the update surface: tasks run in the background and their outcomes
//! are printed here, one block per task, in completion order.

use anyhow::{Result, bail};
use chrono::Local;
use colored::Colorize;
use invc_core::{Capability, Dashboard, TaskOutcome};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::render;

/// Tally of outcomes that did not run to completion
#[derive(Clone, Default)]
struct Failures(Rc<Cell<usize>>);

impl Failures {
    fn record(&self, outcome: &TaskOutcome) {
        if !outcome.is_success() {
            self.bump();
        }
    }

    fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }

    fn count(&self) -> usize {
        self.0.get()
    }
}

pub async fn documents(paths: Vec<PathBuf>, config: &Config) -> Result<()> {
    let mut dashboard = super::dashboard(config);
    let timeout = Duration::from_secs(config.tool(Capability::DocumentAnalysis).timeout_secs);
    let failures = Failures::default();
    let total = paths.len();

    for path in paths {
        let label = path.display().to_string();
        print!("{}", render::header("Starting analysis of", &label, Local::now()));

        let tally = failures.clone();
        let shown = label.clone();
        let submitted = dashboard.submit_document_analysis(&path, move |outcome| {
            render::print_outcome(&shown, &outcome, "Analysis", timeout);
            tally.record(&outcome);
        });
        report_submission(submitted, &failures);
    }

    wait_for_outcomes(&mut dashboard).await?;
    summarize(&failures, total)
}

pub async fn url(url: &str, config: &Config) -> Result<()> {
    let mut dashboard = super::dashboard(config);
    let timeout = Duration::from_secs(config.tool(Capability::UrlInvestigation).timeout_secs);
    let failures = Failures::default();

    let shown = url.trim().to_string();
    print!("{}", render::header("Starting investigation of", &shown, Local::now()));

    let tally = failures.clone();
    let submitted = dashboard.submit_url_investigation(url, move |outcome| {
        render::print_outcome(&shown, &outcome, "Investigation", timeout);
        tally.record(&outcome);
    });
    report_submission(submitted, &failures);

    wait_for_outcomes(&mut dashboard).await?;
    summarize(&failures, 1)
}

fn report_submission(submitted: invc_core::Result<invc_core::TaskId>, failures: &Failures) {
    match submitted {
        Ok(id) => println!("{} {}\n", "Task".dimmed(), id.to_string().dimmed()),
        Err(e) => {
            println!("{} {}\n", "Error:".red().bold(), e);
            failures.bump();
        }
    }
}

async fn wait_for_outcomes(dashboard: &mut Dashboard) -> Result<()> {
    tokio::select! {
        _ = dashboard.run_until_idle() => Ok(()),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted while tasks were running");
            bail!("Interrupted; running tools were abandoned")
        }
    }
}

fn summarize(failures: &Failures, total: usize) -> Result<()> {
    match failures.count() {
        0 => Ok(()),
        n => bail!("{} of {} task(s) did not complete", n, total),
    }
}
