// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod config_extraction;
pub mod setup;
pub mod version;
pub mod promotion;

// Re-export use cases for convenience
pub use config_extraction::{ConfigExtractor, ExtractionError};
pub use promotion::PromotionCoordinator;
pub use setup::{AppError, AppSetupService, SetupJob, SetupPipeline, SetupStages};
pub use version::{VersionError, VersionService};
