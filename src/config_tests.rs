// File: config_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#[cfg(test)]
mod tests {
    use crate::config::TokenParam;
    use crate::policy::Mode;
    use rstest::*;
    use std::time::Duration;

    #[test]
    fn test_token_param_default() {
        let config = TokenParam::default();

        assert_eq!(config.workers(), 5);
        assert_eq!(config.request_delay_ms(), 0);
        assert_eq!(config.timeout(), 10);
        assert_eq!(config.mode(), Mode::Standard);
    }

    #[test]
    fn test_token_param_new_matches_default() {
        assert_eq!(TokenParam::new(), TokenParam::default());
    }

    #[rstest]
    #[case(1)]
    #[case(4)]
    #[case(10)]
    #[case(32)]
    fn test_set_workers(#[case] workers_value: usize) {
        let mut config = TokenParam::new();

        config.set_workers(workers_value);
        assert_eq!(config.workers(), workers_value);
    }

    #[rstest]
    #[case(0)]
    #[case(50)]
    #[case(1000)]
    fn test_set_request_delay(#[case] delay_ms: u64) {
        let mut config = TokenParam::new();

        config.set_request_delay_ms(delay_ms);
        assert_eq!(config.request_delay_ms(), delay_ms);
        assert_eq!(config.request_delay(), Duration::from_millis(delay_ms));
    }

    #[rstest]
    #[case(0)]
    #[case(5)]
    #[case(120)]
    fn test_set_timeout(#[case] timeout_value: u64) {
        let mut config = TokenParam::new();

        config.set_timeout(timeout_value);
        assert_eq!(config.timeout(), timeout_value);
    }

    #[rstest]
    #[case(Mode::Safe)]
    #[case(Mode::Protected)]
    #[case(Mode::Standard)]
    #[case(Mode::Attack)]
    fn test_set_mode(#[case] mode: Mode) {
        let mut config = TokenParam::new();

        config.set_mode(mode);
        assert_eq!(config.mode(), mode);
    }

    #[test]
    fn test_config_copy_is_independent() {
        let mut config1 = TokenParam::new();
        let config2 = config1;

        config1.set_workers(50);
        config1.set_mode(Mode::Safe);

        assert_eq!(config2.workers(), 5);
        assert_eq!(config2.mode(), Mode::Standard);
    }

    #[test]
    fn test_config_debug_format() {
        let config = TokenParam::new();
        let debug_str = format!("{:?}", config);

        assert!(debug_str.contains("TokenParam"));
        assert!(debug_str.contains("workers"));
        assert!(debug_str.contains("request_delay_ms"));
        assert!(debug_str.contains("timeout"));
        assert!(debug_str.contains("mode"));
    }
}
