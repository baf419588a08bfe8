// SPDX-License-Identifier: MIT OR Apache-2.0
//! rae-glob
#![deny(unsafe_code)]
//!
//! Request path patterns (`/api/**`, `/v?/orders/*`) deciding whether a
//! request path belongs to a REST API and should get a mapped error body.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Result of evaluating a request path against the API path patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDecision {
    /// Path matches an API pattern and no exclusion.
    Api,
    /// Path matched an exclusion pattern.
    Excluded,
    /// Path did not match any API pattern.
    NotAnApiPath,
}

impl PathDecision {
    /// Returns `true` only for [`PathDecision::Api`].
    pub fn is_api(self) -> bool {
        matches!(self, Self::Api)
    }
}

/// Compiled API/exclusion pattern pair for request paths.
///
/// Unlike file globs, a single `*` never crosses a `/`, and a trailing `/**`
/// also matches the bare prefix (`/api/**` matches `/api`). Exclusions take
/// precedence. An empty API pattern list matches nothing.
#[derive(Debug, Clone)]
pub struct ApiPathPatterns {
    patterns: Vec<String>,
    api: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl ApiPathPatterns {
    /// Compile API and exclusion pattern lists into a reusable matcher.
    pub fn new(api: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: api.to_vec(),
            api: build_globset(api)?,
            exclude: build_globset(exclude)?,
        })
    }

    /// The API patterns as configured.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Evaluate a request path. Any query string is ignored.
    pub fn decide(&self, path: &str) -> PathDecision {
        let path = strip_query(path);
        if self.exclude.as_ref().is_some_and(|set| set.is_match(path)) {
            return PathDecision::Excluded;
        }
        match &self.api {
            Some(set) if set.is_match(path) => PathDecision::Api,
            _ => PathDecision::NotAnApiPath,
        }
    }

    /// Shorthand for `self.decide(path).is_api()`.
    pub fn is_match(&self, path: &str) -> bool {
        self.decide(path).is_api()
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once(['?', '#']).map_or(path, |(p, _)| p)
}

/// Compile a list of path patterns into a [`GlobSet`], returning `None` for empty input.
pub fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut b = GlobSetBuilder::new();
    for p in patterns {
        b.add(compile(p)?);
        if let Some(prefix) = p.strip_suffix("/**")
            && !prefix.is_empty()
        {
            b.add(compile(prefix)?);
        }
    }
    Ok(Some(b.build()?))
}

fn compile(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid path pattern: {pattern}"))
}
