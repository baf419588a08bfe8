// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiled, read-only lookup tables.

use crate::{DEFAULT_STATUS, MapperProperties, MappingOptions, MappingRule};
use std::collections::HashMap;

/// How an entry was found for a kind chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Entry for the most specific kind.
    Exact,
    /// Entry for a more general kind, `distance` steps up the chain.
    Ancestor {
        /// Position in the chain (at least 1).
        distance: usize,
    },
    /// No kind in the chain had an entry; the default was used.
    Default,
}

impl Match {
    /// Returns `true` unless the entry belongs to the most specific kind.
    pub fn is_inherited(self) -> bool {
        !matches!(self, Self::Exact)
    }
}

/// A table entry together with how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a, T: ?Sized> {
    /// The entry.
    pub value: &'a T,
    /// How it was found.
    pub matched: Match,
    /// Kind the entry is registered under; `None` for the default entry.
    pub kind: Option<&'a str>,
}

/// Immutable rule tables compiled from [`MapperProperties`].
///
/// Each table holds an explicit default entry so that every lookup is
/// total. Lookups walk the kind chain from the most specific kind upwards
/// and return the first entry found. The tables are never mutated after
/// construction and can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct MappingConfig {
    mappings: HashMap<String, MappingRule>,
    default_mapping: MappingRule,
    options: HashMap<String, MappingOptions>,
    default_options: MappingOptions,
}

impl MappingConfig {
    /// Compile the rule tables. Later entries for the same kind replace
    /// earlier ones.
    pub fn new(props: &MapperProperties) -> Self {
        let mut default_mapping = props.default_mapping.clone();
        default_mapping.status.get_or_insert(DEFAULT_STATUS);
        Self {
            mappings: props
                .mappings
                .iter()
                .map(|m| (m.exception.clone(), m.rule.clone()))
                .collect(),
            default_mapping,
            options: props
                .options
                .iter()
                .map(|o| (o.exception.clone(), o.options))
                .collect(),
            default_options: props.default_options,
        }
    }

    /// The default mapping. Its status is always set.
    pub fn default_mapping(&self) -> &MappingRule {
        &self.default_mapping
    }

    /// The default options.
    pub fn default_options(&self) -> &MappingOptions {
        &self.default_options
    }

    /// Nearest mapping for the chain, or the default mapping.
    pub fn find_mapping<K: AsRef<str>>(&self, kinds: &[K]) -> Resolved<'_, MappingRule> {
        walk(&self.mappings, kinds, |_| true).unwrap_or(Resolved {
            value: &self.default_mapping,
            matched: Match::Default,
            kind: None,
        })
    }

    /// Nearest mapping that defines an error code, falling back to the
    /// default mapping's code.
    ///
    /// This walk is independent of [`find_mapping`](Self::find_mapping): a
    /// nearer mapping without a code does not hide a farther one with a code.
    pub fn find_error_code<K: AsRef<str>>(&self, kinds: &[K]) -> Option<Resolved<'_, str>> {
        walk(&self.mappings, kinds, |m| m.code.is_some())
            .and_then(code_of)
            .or_else(|| {
                code_of(Resolved {
                    value: &self.default_mapping,
                    matched: Match::Default,
                    kind: None,
                })
            })
    }

    /// Nearest options for the chain, or the default options.
    pub fn find_options<K: AsRef<str>>(&self, kinds: &[K]) -> Resolved<'_, MappingOptions> {
        walk(&self.options, kinds, |_| true).unwrap_or(Resolved {
            value: &self.default_options,
            matched: Match::Default,
            kind: None,
        })
    }
}

fn code_of(r: Resolved<'_, MappingRule>) -> Option<Resolved<'_, str>> {
    let code = r.value.code.as_deref()?;
    Some(Resolved {
        value: code,
        matched: r.matched,
        kind: r.kind,
    })
}

fn walk<'a, T, K: AsRef<str>>(
    table: &'a HashMap<String, T>,
    kinds: &[K],
    accept: impl Fn(&T) -> bool,
) -> Option<Resolved<'a, T>> {
    let own = kinds.first().map(AsRef::as_ref);
    kinds.iter().enumerate().find_map(|(distance, kind)| {
        let (key, value) = table.get_key_value(kind.as_ref())?;
        accept(value).then_some(Resolved {
            value,
            matched: if own == Some(kind.as_ref()) {
                Match::Exact
            } else {
                Match::Ancestor { distance }
            },
            kind: Some(key.as_str()),
        })
    })
}
