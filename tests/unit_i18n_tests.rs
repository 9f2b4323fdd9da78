//! # I18n Unit Tests / 国际化单元测试
//!
//! Locale selection and the localised labels used by the console and HTML
//! reports.
//!
//! 语言选择以及控制台和 HTML 报告使用的本地化标签。

use regression_runner::core::models::{TestResult, TestStatus};
use regression_runner::select_locale;

#[cfg(test)]
mod locale_selection_tests {
    use super::*;

    #[test]
    fn test_exact_locale_is_kept() {
        assert_eq!(select_locale(Some("zh-CN")), "zh-CN");
        assert_eq!(select_locale(Some("en")), "en");
    }

    #[test]
    fn test_region_falls_back_to_language() {
        assert_eq!(select_locale(Some("en-GB")), "en");
        assert_eq!(select_locale(Some("en_US")), "en");
    }

    #[test]
    fn test_unknown_locale_still_yields_an_available_one() {
        let chosen = select_locale(Some("xx-YY"));
        assert!(["en", "zh-CN"].contains(&chosen.as_str()), "got {chosen}");
    }
}

#[cfg(test)]
mod label_tests {
    use super::*;

    #[test]
    fn test_english_labels() {
        assert_eq!(TestStatus::Running.label("en"), "Running");
        assert_eq!(TestStatus::Terminated.label("en"), "Terminated");
        assert_eq!(TestResult::Passed.label("en"), "Passed");
        assert_eq!(TestResult::NotApplicable.label("en"), "N/A");
    }

    #[test]
    fn test_chinese_labels() {
        assert_eq!(TestStatus::Running.label("zh-CN"), "运行中");
        assert_eq!(TestResult::Failed.label("zh-CN"), "失败");
    }

    #[test]
    fn test_missing_locale_falls_back_to_english() {
        assert_eq!(TestResult::Failed.label("fr"), "Failed");
    }
}
