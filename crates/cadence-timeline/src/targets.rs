//! Target specifiers and resolution.
//!
//! A definition names its targets with a `TargetSpec`: a direct id, a
//! selector the host resolves, a nested list, or a deferred producer that is
//! evaluated when the definition is added. Resolution flattens all of these
//! into a list of `TargetId`s. Duplicates are kept; each occurrence gets its
//! own index for staggering.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

use crate::types::TargetId;

type DeferredFn = Arc<dyn Fn() -> TargetSpec + Send + Sync>;

/// Description of which targets an animation applies to.
#[derive(Clone)]
pub enum TargetSpec {
    /// A single target.
    Id(TargetId),
    /// A query resolved through the host's `TargetResolver`.
    Selector(String),
    /// Several specifiers, flattened in order.
    List(Vec<TargetSpec>),
    /// Produces a specifier on demand.
    Deferred(DeferredFn),
}

impl TargetSpec {
    pub fn id(id: impl Into<TargetId>) -> Self {
        Self::Id(id.into())
    }

    pub fn selector(query: impl Into<String>) -> Self {
        Self::Selector(query.into())
    }

    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn() -> TargetSpec + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(f))
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl fmt::Debug for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Self::Selector(q) => f.debug_tuple("Selector").field(q).finish(),
            Self::List(list) => f.debug_tuple("List").field(list).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<TargetId> for TargetSpec {
    fn from(id: TargetId) -> Self {
        Self::Id(id)
    }
}

/// Strings are selectors; use [`TargetSpec::id`] for a literal id.
impl From<&str> for TargetSpec {
    fn from(query: &str) -> Self {
        Self::Selector(query.to_string())
    }
}

impl<T: Into<TargetSpec>> From<Vec<T>> for TargetSpec {
    fn from(list: Vec<T>) -> Self {
        Self::List(list.into_iter().map(Into::into).collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTargetSpec {
    One(String),
    Many(Vec<RawTargetSpec>),
}

impl From<RawTargetSpec> for TargetSpec {
    fn from(raw: RawTargetSpec) -> Self {
        match raw {
            RawTargetSpec::One(query) => Self::Selector(query),
            RawTargetSpec::Many(list) => Self::List(list.into_iter().map(Self::from).collect()),
        }
    }
}

/// A string is a selector; an array is a list of specifiers.
impl<'de> Deserialize<'de> for TargetSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawTargetSpec::deserialize(deserializer).map(Self::from)
    }
}

/// Host hook turning selectors into targets.
pub trait TargetResolver {
    fn query(&self, selector: &str) -> Vec<TargetId>;
}

/// Treats every selector as a literal target id.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl TargetResolver for IdentityResolver {
    fn query(&self, selector: &str) -> Vec<TargetId> {
        vec![TargetId::from(selector)]
    }
}

/// Flatten `spec` into target ids, in order.
pub fn resolve_targets(spec: &TargetSpec, resolver: &dyn TargetResolver) -> Vec<TargetId> {
    let mut out = Vec::new();
    collect(spec, resolver, &mut out);
    out
}

fn collect(spec: &TargetSpec, resolver: &dyn TargetResolver, out: &mut Vec<TargetId>) {
    match spec {
        TargetSpec::Id(id) => out.push(id.clone()),
        TargetSpec::Selector(query) => out.extend(resolver.query(query)),
        TargetSpec::List(list) => {
            for item in list {
                collect(item, resolver, out);
            }
        }
        TargetSpec::Deferred(f) => collect(&f(), resolver, out),
    }
}
