// File: policy.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::request::RequestTemplate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating mode governing whether active token generation may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Safe,
    Protected,
    Standard,
    Attack,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Safe => write!(f, "safe"),
            Mode::Protected => write!(f, "protected"),
            Mode::Standard => write!(f, "standard"),
            Mode::Attack => write!(f, "attack"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "safe" => Ok(Mode::Safe),
            "protect" | "protected" => Ok(Mode::Protected),
            "standard" => Ok(Mode::Standard),
            "attack" => Ok(Mode::Attack),
            other => Err(format!("Unknown mode: {}", other)),
        }
    }
}

pub trait PolicyCheck: Send + Sync {
    fn allowed(&self, mode: Mode, target: &RequestTemplate) -> bool;
}

/// Safe mode forbids generation outright, protected mode only allows
/// targets whose host is in scope.
#[derive(Debug, Clone, Default)]
pub struct ScopePolicy {
    in_scope_hosts: Vec<String>,
}

impl ScopePolicy {
    pub fn new() -> Self {
        Self {
            in_scope_hosts: Vec::new(),
        }
    }

    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            in_scope_hosts: hosts
                .into_iter()
                .map(|h| h.into().to_lowercase())
                .collect(),
        }
    }

    pub fn add_host(&mut self, host: &str) {
        self.in_scope_hosts.push(host.to_lowercase());
    }

    pub fn is_in_scope(&self, target: &RequestTemplate) -> bool {
        let Some(host) = target.host() else {
            return false;
        };
        let host = host.to_lowercase();
        self.in_scope_hosts
            .iter()
            .any(|scope| host == *scope || host.ends_with(&format!(".{}", scope)))
    }
}

impl PolicyCheck for ScopePolicy {
    fn allowed(&self, mode: Mode, target: &RequestTemplate) -> bool {
        let allowed = match mode {
            Mode::Safe => false,
            Mode::Protected => self.is_in_scope(target),
            Mode::Standard | Mode::Attack => true,
        };
        debug!("Policy check for {} in {} mode: {}", target.url(), mode, allowed);
        allowed
    }
}
