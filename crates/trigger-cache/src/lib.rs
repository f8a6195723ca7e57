//! Compiled trigger lookup for keyflow.
//!
//! [`TriggerCache`] turns a configuration into a hash map from
//! `(scope, prefix, signature, mode)` to a partial or exact match, so the
//! match loop resolves every keystroke with a handful of probes.
mod cache;
mod ids;
mod listing;

#[cfg(test)]
mod test_lookup;

pub use cache::{CacheKey, LookupContext, MatchResult, TriggerCache};
pub use ids::{ModeId, PrefixId, ScopeId};
pub use listing::PrefixListing;
