//! Application identity derived from the user-supplied name
//!
//! A raw name such as `github.com/Foo/Bar` yields the module identifier
//! `github.com/foo/bar` and the short name `bar`, which names the
//! generated directory.

use crate::{Result, SproutError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Separator between module path segments
pub const MODULE_SEPARATOR: char = '/';

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._~-]+$").expect("segment pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    pub raw_input: String,
    pub short_name: String,
    pub module_id: String,
}

impl AppIdentity {
    /// Normalize a raw application name
    ///
    /// The input is lower-cased. When it contains a `/` the whole lower-cased
    /// input is kept as the module identifier and the short name is whatever
    /// follows the last separator. Otherwise both are the lower-cased input.
    ///
    /// Never fails; use [`AppIdentity::validate`] to reject unusable names.
    pub fn sanitize(raw: &str) -> Self {
        let module_id = raw.to_lowercase();
        let short_name = match module_id.rfind(MODULE_SEPARATOR) {
            Some(idx) => module_id[idx + MODULE_SEPARATOR.len_utf8()..].to_string(),
            None => module_id.clone(),
        };

        Self {
            raw_input: raw.to_string(),
            short_name,
            module_id,
        }
    }

    /// Reject names that cannot serve as a directory name or module path
    pub fn validate(&self) -> Result<()> {
        if self.short_name.is_empty() {
            return Err(SproutError::InvalidName(format!(
                "'{}' does not end in a usable name",
                self.raw_input
            )));
        }
        if self.short_name == "." || self.short_name == ".." {
            return Err(SproutError::InvalidName(format!(
                "'{}' is not a valid directory name",
                self.short_name
            )));
        }

        for segment in self.module_id.split(MODULE_SEPARATOR) {
            if segment.is_empty() {
                return Err(SproutError::InvalidName(format!(
                    "'{}' contains an empty path segment",
                    self.raw_input
                )));
            }
            if !SEGMENT_RE.is_match(segment) {
                return Err(SproutError::InvalidName(format!(
                    "'{}' may only contain letters, digits, '.', '_', '~', '-' and '/'",
                    self.raw_input
                )));
            }
        }

        Ok(())
    }

    /// True when the name was given as a hierarchical module path
    pub fn is_hierarchical(&self) -> bool {
        self.module_id.contains(MODULE_SEPARATOR)
    }
}
