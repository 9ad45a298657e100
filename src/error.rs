// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenGenError {
    #[error("Policy violation: {0}")]
    PolicyViolation(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TokenGenError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<url::ParseError> for TokenGenError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

pub type TokenGenResult<T> = Result<T, TokenGenError>;
