// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod queue;
pub mod security;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod test_utils;
