// File: report_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#[cfg(test)]
mod tests {
    use crate::analysis::{TestResult, Verdict};
    use crate::coordinator::RunState;
    use crate::report::*;
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_report() -> RunReport {
        let started = Utc::now();
        RunReport {
            target: "https://example.com/login".to_string(),
            token_name: "JSESSIONID".to_string(),
            token_type: "cookie".to_string(),
            state: RunState::Completed,
            target_count: 100,
            collected: 96,
            issued_requests: 100,
            failed_requests: 0,
            extraction_misses: 4,
            started: Some(started),
            finished: Some(started + Duration::milliseconds(1500)),
            results: vec![
                TestResult::new(
                    "token_count",
                    Verdict::Pass,
                    Some(96.0),
                    "96 tokens collected, all distinct".to_string(),
                ),
                TestResult::new(
                    "effective_entropy",
                    Verdict::Warn,
                    Some(90.5),
                    "About 90.5 bits of entropy".to_string(),
                ),
                TestResult::new("runs", Verdict::Fail, None, "Too few runs".to_string()),
            ],
        }
    }

    fn create_temp_file(name: &str) -> (TempDir, String) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join(name).to_string_lossy().to_string();
        (temp_dir, file_path)
    }

    #[test]
    fn test_overall_is_worst_verdict() {
        let mut report = create_test_report();
        assert_eq!(report.overall(), Some(Verdict::Fail));
        report.results.truncate(1);
        assert_eq!(report.overall(), Some(Verdict::Pass));
        report.results.clear();
        assert_eq!(report.overall(), None);
    }

    #[test]
    fn test_generate_text_report() {
        let (_temp_dir, file_path) = create_temp_file("report.txt");
        let report = create_test_report();

        let result = ReportGenerator::generate_text_report(&report, &file_path);
        assert!(result.is_ok());

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.contains("tokenprobe Randomness Report"));
        assert!(content.contains("Date:"));
        assert!(content.contains("Target: https://example.com/login"));
        assert!(content.contains("Token: JSESSIONID (cookie)"));
        assert!(content.contains("Collected: 96 of 100 requested"));
        assert!(content.contains("4 without token"));
        assert!(content.contains("Duration: 1500 ms"));
        assert!(content.contains("[PASS] token_count (96.00)"));
        assert!(content.contains("[WARN] effective_entropy (90.50)"));
        assert!(content.contains("[FAIL] runs: Too few runs"));
        assert!(content.contains("Overall: FAIL"));
    }

    #[test]
    fn test_text_report_without_results() {
        let mut report = create_test_report();
        report.results.clear();
        let content = ReportGenerator::render_text(&report);
        assert!(content.contains("No analysis results."));
        assert!(!content.contains("Overall:"));
    }

    #[test]
    fn test_generate_json_report() {
        let (_temp_dir, file_path) = create_temp_file("report.json");
        let report = create_test_report();

        ReportGenerator::generate_report(&report, &file_path, ReportFormat::Json).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let json: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["target"], "https://example.com/login");
        assert_eq!(json["state"], "completed");
        assert_eq!(json["collected"], 96);
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["test_name"], "token_count");
        assert_eq!(results[1]["verdict"], "warn");
        assert!(results[2]["score"].is_null());
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!("TEXT".parse::<ReportFormat>(), Ok(ReportFormat::Text));
        assert_eq!("json".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert!("html".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_report_to_missing_directory_fails() {
        let report = create_test_report();
        let result =
            ReportGenerator::generate_text_report(&report, "/nonexistent/dir/report.txt");
        assert!(result.is_err());
    }
}
