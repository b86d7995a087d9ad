// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the appforge CLI

pub mod config;
pub mod migrate;
pub mod promote;
pub mod serve;

pub use self::config::ConfigCommand;
pub use self::migrate::MigrateCommand;
pub use self::promote::PromoteCommand;
pub use self::serve::ServeCommand;
