// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised at the node-setter boundary.

use alloc::string::String;
use core::fmt;

/// Errors from string-keyed node setters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeError {
    /// The key is not one of the node's recognized keys.
    UnknownKey(String),
    /// The key exists but the value has the wrong shape for it.
    ValueMismatch {
        /// The key being set.
        key: &'static str,
        /// The value shape the key accepts.
        expected: &'static str,
    },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "unknown node key `{key}`"),
            Self::ValueMismatch { key, expected } => {
                write!(f, "value for `{key}` must be {expected}")
            }
        }
    }
}

impl core::error::Error for NodeError {}
