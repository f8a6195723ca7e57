//! Interned identifiers that make cache keys `Copy`.

use std::collections::HashMap;

use config::UserModeId;
use mac_keycode::Signature;

/// Interned application scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// Wildcard scope matching every application.
    pub const GLOBAL: Self = Self(0);

    /// True for the wildcard scope.
    pub fn is_global(self) -> bool {
        self == Self::GLOBAL
    }
}

/// Interned chord prefix: the sequence of signatures consumed so far.
///
/// Defaults to [`PrefixId::IDLE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixId(u32);

impl PrefixId {
    /// The empty prefix; the coordinator is idle.
    pub const IDLE: Self = Self(0);

    /// True for the empty prefix.
    pub fn is_idle(self) -> bool {
        self == Self::IDLE
    }
}

/// Interned user mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(u32);

/// Intern tables for one cache build.
#[derive(Debug, Default)]
pub(crate) struct Interner {
    scopes: HashMap<String, ScopeId>,
    modes: HashMap<UserModeId, ModeId>,
    prefixes: HashMap<(PrefixId, Signature), PrefixId>,
    /// Signature path for each prefix, indexed by id.
    paths: Vec<Vec<Signature>>,
}

impl Interner {
    pub(crate) fn new() -> Self {
        Self {
            paths: vec![Vec::new()],
            ..Self::default()
        }
    }

    pub(crate) fn scope(&mut self, bundle_id: &str) -> ScopeId {
        let next = ScopeId(self.scopes.len() as u32 + 1);
        *self.scopes.entry(bundle_id.to_string()).or_insert(next)
    }

    pub(crate) fn find_scope(&self, bundle_id: &str) -> Option<ScopeId> {
        self.scopes.get(bundle_id).copied()
    }

    pub(crate) fn mode(&mut self, id: &UserModeId) -> ModeId {
        let next = ModeId(self.modes.len() as u32);
        *self.modes.entry(id.clone()).or_insert(next)
    }

    pub(crate) fn find_mode(&self, id: &UserModeId) -> Option<ModeId> {
        self.modes.get(id).copied()
    }

    /// The prefix reached by appending `sig` to `parent`.
    pub(crate) fn extend(&mut self, parent: PrefixId, sig: Signature) -> PrefixId {
        if let Some(id) = self.prefixes.get(&(parent, sig)) {
            return *id;
        }
        let id = PrefixId(self.paths.len() as u32);
        let mut path = self.path(parent).to_vec();
        path.push(sig);
        self.paths.push(path);
        self.prefixes.insert((parent, sig), id);
        id
    }

    /// Signatures consumed by `prefix`; empty for unknown ids.
    pub(crate) fn path(&self, prefix: PrefixId) -> &[Signature] {
        self.paths
            .get(prefix.0 as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
