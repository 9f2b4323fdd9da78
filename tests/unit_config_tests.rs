//! # Configuration Unit Tests / 配置单元测试
//!
//! Loading `Regression.toml` and turning it into runtime options.

use regression_runner::core::config::{
    RegressionConfig, RunOptions, default_run_limit, load_config, load_config_or_default,
};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[cfg(test)]
mod load_tests {
    use super::*;

    #[test]
    fn test_full_config_is_parsed() {
        let content = r#"
language = "zh-CN"

[regression]
run_limit = 3
timeout_secs = 60
kill_grace_secs = 2
progress_interval_ms = 50
shell = "/bin/bash"
fail_fast = true

[report]
directory = "~/regressions"

[classifier]
enabled = true
pass_marker = "TEST PASSED"
fail_marker = "TEST FAILED"
log_flag = "log"
"#;
        let config: RegressionConfig = toml::from_str(content).unwrap();

        assert_eq!(config.language.as_deref(), Some("zh-CN"));
        assert_eq!(config.regression.run_limit, Some(3));
        assert_eq!(config.report.directory, "~/regressions");
        assert_eq!(config.classifier.log_flag.as_deref(), Some("log"));

        let options = config.run_options();
        assert_eq!(options.run_limit.get(), 3);
        assert_eq!(options.test_timeout, Some(Duration::from_secs(60)));
        assert_eq!(options.kill_grace, Duration::from_secs(2));
        assert_eq!(options.progress_interval, Duration::from_millis(50));
        assert_eq!(options.shell, "/bin/bash");
        assert!(options.fail_fast);
        assert!(options.classifier.is_some());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: RegressionConfig = toml::from_str("").unwrap();
        let options = config.run_options();
        let defaults = RunOptions::default();

        assert_eq!(config.report.directory, "regressions");
        assert!(!config.classifier.enabled);
        assert_eq!(config.classifier.pass_marker, "PPPP");
        assert_eq!(config.classifier.fail_marker, "FFFF");
        assert_eq!(options.run_limit, default_run_limit());
        assert_eq!(options.shell, "/bin/sh");
        assert_eq!(options.test_timeout, None);
        assert_eq!(options.kill_grace, defaults.kill_grace);
        assert!(!options.fail_fast);
        assert!(options.classifier.is_none());
    }

    #[test]
    fn test_zero_run_limit_falls_back_to_default() {
        let config: RegressionConfig = toml::from_str("[regression]\nrun_limit = 0\n").unwrap();
        assert_eq!(config.run_options().run_limit, default_run_limit());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Regression.toml");
        fs::write(&path, "[regression]\nrun_limit = 5\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.regression.run_limit, Some(5));
    }

    #[test]
    fn test_invalid_toml_is_an_error_with_context() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        fs::write(&path, "[regression\nrun_limit = ").unwrap();

        let error = load_config(&path).unwrap_err();
        assert!(format!("{error:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_file_is_default_only_when_optional() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(load_config(&path).is_err());
        assert_eq!(load_config_or_default(&path).unwrap(), RegressionConfig::default());
    }
}

#[cfg(test)]
mod run_options_tests {
    use super::*;

    #[test]
    fn test_default_run_limit_is_half_the_cpus_plus_one() {
        assert_eq!(default_run_limit().get(), num_cpus::get() / 2 + 1);
    }

    #[test]
    fn test_builders() {
        let options = RunOptions::default()
            .with_run_limit(0)
            .with_timeout(Some(Duration::from_secs(1)))
            .with_kill_grace(Duration::from_millis(100))
            .with_fail_fast(true);

        assert_eq!(options.run_limit.get(), 1);
        assert_eq!(options.test_timeout, Some(Duration::from_secs(1)));
        assert_eq!(options.kill_grace, Duration::from_millis(100));
        assert!(options.fail_fast);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = RegressionConfig::default();
        config.regression.run_limit = Some(2);
        config.classifier.enabled = true;

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RegressionConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
