// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_inception)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]
#![allow(clippy::useless_vec)]
#![allow(clippy::too_many_arguments)]

pub mod analysis;
pub mod cli;
pub mod collector;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod getstate;
pub mod history;
pub mod http;
pub mod httpinner;
pub mod policy;
pub mod registry;
pub mod report;
pub mod request;
pub mod sample_set;
pub mod statistics;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod report_tests;
