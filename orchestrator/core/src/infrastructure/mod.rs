// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod repositories;
pub mod db;
pub mod event_bus;
pub mod llm;
pub mod registry;
pub mod image_generation;
pub mod object_store;
pub mod vercel;

pub use event_bus::EventBus;
