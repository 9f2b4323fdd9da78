//! # Commands / 子命令
//!
//! One module per `rgr` subcommand.

pub mod init;
pub mod rerun;
pub mod run;
