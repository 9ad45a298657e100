// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use tokenprobe::analysis::{TestResult, Verdict};
use tokenprobe::cli::Cli;
use tokenprobe::config::TokenParam;
use tokenprobe::coordinator::RunState;
use tokenprobe::extractor::form_input_fields;
use tokenprobe::history::InMemoryHistory;
use tokenprobe::http::{ReqwestTransport, Transport};
use tokenprobe::policy::ScopePolicy;
use tokenprobe::registry::{RunRegistry, RunRequest};
use tokenprobe::report::{ReportGenerator, RunReport};
use tokenprobe::request::RequestTemplate;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn build_template(cli: &Cli) -> Result<RequestTemplate> {
    let mut template = RequestTemplate::new(&cli.method, &cli.url)
        .with_context(|| format!("Invalid target {} {}", cli.method, cli.url))?;
    for header in &cli.headers {
        template = template
            .with_raw_header(header)
            .with_context(|| format!("Invalid header '{}'", header))?;
    }
    if let Some(data) = &cli.data {
        template = template.with_body(data.clone());
    }
    Ok(template)
}

fn build_param(cli: &Cli) -> TokenParam {
    let mut param = TokenParam::new();
    param.set_workers(cli.workers);
    param.set_request_delay_ms(cli.delay_ms);
    param.set_timeout(cli.timeout);
    param.set_mode(cli.mode);
    param
}

async fn list_fields(transport: &dyn Transport, template: &RequestTemplate, strip: bool) -> Result<()> {
    let response = transport
        .issue(template, strip)
        .await
        .context("Failed to fetch the target page")?;
    let fields = form_input_fields(response.body());
    if fields.is_empty() {
        println!("{} No form input fields found", "⚠".yellow().bold());
    }
    for field in fields {
        println!("  {} {}", "•".dimmed(), field);
    }
    Ok(())
}

fn print_result(result: &TestResult) {
    let verdict = match result.verdict {
        Verdict::Pass => result.verdict.to_string().green().bold(),
        Verdict::Warn => result.verdict.to_string().yellow().bold(),
        Verdict::Fail => result.verdict.to_string().red().bold(),
    };
    println!(
        "[{}] {}: {}",
        verdict,
        result.test_name.bold(),
        result.description
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level_filter())
        .init()
        .context("Failed to initialise logger")?;
    if cli.no_color {
        colored::control::set_override(false);
    }

    let template = build_template(&cli)?;
    let transport = Arc::new(ReqwestTransport::new(cli.timeout)?);

    if cli.list_fields {
        return list_fields(transport.as_ref(), &template, !cli.keep_cookies).await;
    }
    let token_name = cli
        .token_name
        .clone()
        .context("--token-name is required")?;

    let history = Arc::new(InMemoryHistory::new());
    let message_id = history.record(template);
    let policy = Arc::new(ScopePolicy::with_hosts(cli.scope.iter().cloned()));
    let registry = RunRegistry::new(build_param(&cli), transport, history, policy);

    let mut request = RunRequest::from_history(message_id, &token_name, cli.token_type, cli.count);
    if cli.keep_cookies {
        request = request.keep_cookies();
    }
    let id = registry.start_run(request)?;
    let run = registry.run(&id)?;
    info!("Run {} started", id);

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .context("Invalid progress template")?
            .progress_chars("##-"),
    );

    loop {
        let status = registry.get_run_status(&id)?;
        pb.set_position(status.percentage as u64);
        pb.set_message(format!("{} ({} tokens)", run.state(), run.collected()));
        if run.state() == RunState::Completed {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping run {}", id);
                registry.stop_run(&id)?;
            }
        }
    }
    pb.finish_with_message(format!("{} tokens collected", run.collected()));

    let report = RunReport::from_run(&run, &cli.url, &token_name, &cli.token_type.to_string());
    println!();
    for result in &report.results {
        print_result(result);
    }
    if run.is_manually_stopped() {
        println!("{} Run stopped before analysis", "⚠".yellow().bold());
    }

    let stats = run.stats();
    println!(
        "\n{} requests. Collected {} of {} tokens. Failed: {}. Without token: {}. {} ms.",
        stats.issued_requests(),
        report.collected,
        report.target_count,
        stats.failed_requests(),
        stats.extraction_misses(),
        stats.elapsed_ms().unwrap_or(0)
    );
    if let Some(verdict) = report.overall() {
        let overall = match verdict {
            Verdict::Pass => "PASS".green().bold(),
            Verdict::Warn => "WARN".yellow().bold(),
            Verdict::Fail => "FAIL".red().bold(),
        };
        println!("Overall: {}", overall);
    }

    if let Some(path) = &cli.output {
        let path = path.to_string_lossy();
        ReportGenerator::generate_report(&report, &path, cli.format)
            .with_context(|| format!("Failed to write report to {}", path))?;
        println!("Report written to {}", path);
    }

    Ok(())
}
