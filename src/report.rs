// File: report.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::analysis::{TestResult, Verdict};
use crate::coordinator::{CollectionCoordinator, RunState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{Error, ErrorKind, Result, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: String,
    pub token_name: String,
    pub token_type: String,
    pub state: RunState,
    pub target_count: usize,
    pub collected: usize,
    pub issued_requests: u64,
    pub failed_requests: u64,
    pub extraction_misses: u64,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub results: Vec<TestResult>,
}

impl RunReport {
    pub fn from_run(
        run: &CollectionCoordinator,
        target: &str,
        token_name: &str,
        token_type: &str,
    ) -> Self {
        let stats = run.stats();
        Self {
            target: target.to_string(),
            token_name: token_name.to_string(),
            token_type: token_type.to_string(),
            state: run.state(),
            target_count: run.target_count(),
            collected: run.collected(),
            issued_requests: stats.issued_requests(),
            failed_requests: stats.failed_requests(),
            extraction_misses: stats.extraction_misses(),
            started: stats.start_time(),
            finished: stats.end_time(),
            results: run.results(),
        }
    }

    /// Worst verdict in the report, `None` when nothing was analysed.
    pub fn overall(&self) -> Option<Verdict> {
        self.results.iter().map(|r| r.verdict).max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("Unknown report format: {}", other)),
        }
    }
}

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn generate_report(report: &RunReport, output_path: &str, format: ReportFormat) -> Result<()> {
        match format {
            ReportFormat::Text => Self::generate_text_report(report, output_path),
            ReportFormat::Json => Self::generate_json_report(report, output_path),
        }
    }

    pub fn render_text(report: &RunReport) -> String {
        let mut out = String::new();
        out.push_str("tokenprobe Randomness Report\n");
        out.push_str(&format!("Date: {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")));
        out.push_str(&format!("Target: {}\n", report.target));
        out.push_str(&format!("Token: {} ({})\n", report.token_name, report.token_type));
        out.push_str(&format!(
            "Collected: {} of {} requested\n",
            report.collected, report.target_count
        ));
        out.push_str(&format!(
            "Requests: {} issued, {} failed, {} without token\n",
            report.issued_requests, report.failed_requests, report.extraction_misses
        ));
        if let (Some(start), Some(end)) = (report.started, report.finished) {
            out.push_str(&format!(
                "Duration: {} ms\n",
                (end - start).num_milliseconds()
            ));
        }
        out.push('\n');

        if report.results.is_empty() {
            out.push_str("No analysis results.\n");
        }
        for result in &report.results {
            match result.score {
                Some(score) => out.push_str(&format!(
                    "[{}] {} ({:.2}): {}\n",
                    result.verdict, result.test_name, score, result.description
                )),
                None => out.push_str(&format!(
                    "[{}] {}: {}\n",
                    result.verdict, result.test_name, result.description
                )),
            }
        }
        if let Some(verdict) = report.overall() {
            out.push_str(&format!("\nOverall: {}\n", verdict));
        }
        out
    }

    pub fn generate_text_report(report: &RunReport, output_path: &str) -> Result<()> {
        let mut file = File::create(output_path)?;
        write!(file, "{}", Self::render_text(report))?;
        Ok(())
    }

    pub fn generate_json_report(report: &RunReport, output_path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        let mut file = File::create(output_path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}
