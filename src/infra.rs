//! # Infrastructure Module / 基础设施模块
//!
//! OS-facing services used by the core and the CLI: spawning test processes
//! and locating regression files on disk.
//!
//! 核心与命令行使用的操作系统相关服务：派生测试进程以及在磁盘上定位回归文件。

pub mod command;
pub mod fs;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
