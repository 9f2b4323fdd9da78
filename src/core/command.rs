//! # Command Module / 命令模块
//!
//! A parsed, immutable view of a single test invocation line such as
//! `socrun --test chip/smoke_reset --flow nightly --seed 42`.
//!
//! 单条测试调用命令行的不可变解析视图。

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Represents a single shell invocation as whitespace-separated tokens.
/// Token 0 is the program name. The token list is never mutated after parsing,
/// and equality/hashing only look at the tokens, so two lines that differ only
/// in surrounding whitespace are considered the same invocation.
///
/// 将单条 shell 调用表示为以空白分隔的 token 序列。
/// 第 0 个 token 是程序名。解析后 token 列表不会再改变，
/// 相等性与哈希只比较 token，因此仅空白不同的两行被视为同一调用。
#[derive(Debug, Clone, Default)]
pub struct Command {
    line: String,
    tokens: Vec<String>,
}

impl Command {
    /// Parses a command line. Never fails: an empty or blank line yields an
    /// empty sentinel command with no tokens and an empty program name.
    pub fn parse(line: &str) -> Self {
        let line = line.trim().to_string();
        let tokens = line.split_whitespace().map(str::to_string).collect();
        Self { line, tokens }
    }

    /// The raw, trimmed invocation text.
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The program name (token 0), or an empty string for the sentinel command.
    pub fn program(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The line quoted as a single shell word.
    pub fn escaped(&self) -> String {
        shlex::try_quote(&self.line)
            .map(|quoted| quoted.into_owned())
            .unwrap_or_else(|_| self.line.clone())
    }

    /// Returns the token that immediately follows a flag.
    ///
    /// The flag name is normalized so `test`, `-test`, and `--test` all look
    /// for the same three spellings on the command line. Returns `None` when
    /// the flag is absent or is the last token.
    ///
    /// 返回紧跟在某个标志之后的 token。
    /// 标志名会被规范化，`test`、`-test` 与 `--test` 都会匹配这三种写法。
    /// 若标志不存在或位于最后，则返回 `None`。
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let bare = flag.trim_start_matches('-');
        if bare.is_empty() {
            return None;
        }
        let short = format!("-{bare}");
        let long = format!("--{bare}");

        self.tokens
            .iter()
            .position(|token| token == bare || *token == short || *token == long)
            .and_then(|index| self.tokens.get(index + 1))
            .map(String::as_str)
    }

    /// Whether the flag appears anywhere on the line, in any spelling.
    pub fn has_flag(&self, flag: &str) -> bool {
        let bare = flag.trim_start_matches('-');
        !bare.is_empty()
            && self
                .tokens
                .iter()
                .any(|token| token.starts_with('-') && token.trim_start_matches('-') == bare)
    }

    pub fn test(&self) -> Option<&str> {
        self.value_of("test")
    }

    pub fn flow(&self) -> Option<&str> {
        self.value_of("flow")
    }

    /// The `--seed` value parsed as an integer, if present and numeric.
    pub fn seed(&self) -> Option<i64> {
        self.value_of("seed").and_then(|seed| seed.parse().ok())
    }

    pub fn seed_or(&self, default: i64) -> i64 {
        self.seed().unwrap_or(default)
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

impl FromStr for Command {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Command {
    fn from(line: &str) -> Self {
        Self::parse(line)
    }
}

impl From<String> for Command {
    fn from(line: String) -> Self {
        Self::parse(&line)
    }
}

