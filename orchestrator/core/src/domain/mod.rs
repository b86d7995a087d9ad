// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Aggregates, value objects and capability contracts for app provisioning
//! and version promotion.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Business types and the traits infrastructure adapters implement

pub mod app;
pub mod version;
pub mod domain_name;
pub mod events;
pub mod repository;
pub mod llm;
pub mod registry;
pub mod storage;
pub mod deployment;
pub mod service_config;
