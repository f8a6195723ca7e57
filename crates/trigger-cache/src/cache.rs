use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use config::{Trigger, UserModeId, Workflow, WorkflowGroup};
use mac_keycode::{EventKey, Signature};
use tracing::{debug, trace, warn};

use crate::{
    ids::{Interner, ModeId, PrefixId, ScopeId},
    listing::{ListingEntry, PrefixListing, render},
};

/// Rebuilds slower than this are logged at warn level.
const BUILD_WARN_MS: u64 = 10;

/// Composite lookup key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Application scope, or [`ScopeId::GLOBAL`].
    pub scope: ScopeId,
    /// Prefix consumed before this element.
    pub prefix: PrefixId,
    /// Signature of this element.
    pub signature: Signature,
    /// Qualifying user mode; `None` for the mode-less entry.
    pub mode: Option<ModeId>,
}

/// Outcome of a lookup.
#[derive(Clone, Debug)]
pub enum MatchResult {
    /// Nothing registered for this event at any scope.
    None,
    /// The event extends a chord; `prefix` is the prefix reached.
    PartialMatch {
        /// Prefix reached by consuming this event.
        prefix: PrefixId,
        /// The workflow whose chord passes through this element.
        workflow: Arc<Workflow>,
    },
    /// The event completes `workflow`'s chord.
    ExactMatch(Arc<Workflow>),
}

impl MatchResult {
    /// True for [`MatchResult::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Clone, Debug)]
enum Entry {
    Partial {
        next: PrefixId,
        workflow: Arc<Workflow>,
    },
    Exact(Arc<Workflow>),
}

/// Frontmost application and active user modes for a lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupContext {
    /// Bundle id of the frontmost application.
    pub app: Option<String>,
    /// Active user modes, in priority order.
    pub modes: Vec<UserModeId>,
}

impl LookupContext {
    /// Context with only a frontmost application.
    pub fn for_app(app: impl Into<String>) -> Self {
        Self {
            app: Some(app.into()),
            modes: Vec::new(),
        }
    }
}

/// Compiled triggers for the whole configuration.
///
/// Rebuilt wholesale with [`TriggerCache::build`]; never patched.
#[derive(Debug)]
pub struct TriggerCache {
    entries: HashMap<CacheKey, Entry>,
    interner: Interner,
    listing: Vec<ListingEntry>,
}

impl Default for TriggerCache {
    fn default() -> Self {
        Self::empty()
    }
}

impl TriggerCache {
    /// A cache with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            interner: Interner::new(),
            listing: Vec::new(),
        }
    }

    /// Compile every enabled workflow in every enabled group.
    ///
    /// Build order is groups, then workflows, then shortcuts; later writes
    /// replace earlier ones at the same key.
    pub fn build(groups: &[WorkflowGroup]) -> Self {
        let start = Instant::now();
        let mut cache = Self::empty();
        let mut workflows = 0usize;
        for group in groups.iter().filter(|g| !g.disabled) {
            let scopes: Vec<ScopeId> = if group.bundle_identifiers().is_empty() {
                vec![ScopeId::GLOBAL]
            } else {
                group
                    .bundle_identifiers()
                    .iter()
                    .map(|b| cache.interner.scope(b))
                    .collect()
            };
            let mut modes: Vec<Option<ModeId>> = vec![None];
            for m in &group.user_modes {
                modes.push(Some(cache.interner.mode(&m.id)));
            }
            for wf in group.workflows.iter().filter(|w| w.enabled()) {
                if cache.insert_workflow(wf, &scopes, &modes) {
                    workflows += 1;
                }
            }
        }

        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(BUILD_WARN_MS) {
            warn!(
                "Trigger cache build took {:?} for {} workflows ({} entries)",
                elapsed,
                workflows,
                cache.entries.len()
            );
        } else {
            debug!(
                "Trigger cache built in {:?}: {} workflows, {} entries",
                elapsed,
                workflows,
                cache.entries.len()
            );
        }
        cache
    }

    /// Returns false when the workflow has no usable trigger.
    fn insert_workflow(
        &mut self,
        wf: &Workflow,
        scopes: &[ScopeId],
        modes: &[Option<ModeId>],
    ) -> bool {
        let sigs: Vec<Signature> = match wf.trigger() {
            None => return false,
            Some(Trigger::Keyboard(k)) => {
                let mut out = Vec::with_capacity(k.shortcuts.len());
                for s in &k.shortcuts {
                    match s.event_key() {
                        Some(ek) => out.push(ek.signature(s.left_right_specific)),
                        None => {
                            warn!(
                                "workflow '{}': skipping unresolvable shortcut '{}'",
                                wf.id(),
                                s.key
                            );
                            return false;
                        }
                    }
                }
                out
            }
            Some(Trigger::Modifiers(m)) => match m.event_key() {
                Some(ek) => vec![ek.signature(m.left_right_specific)],
                None => {
                    warn!(
                        "workflow '{}': skipping unresolvable modifiers {:?}",
                        wf.id(),
                        m.modifiers
                    );
                    return false;
                }
            },
        };
        let Some((last, init)) = sigs.split_last() else {
            return false;
        };

        let workflow = Arc::new(wf.clone());
        let mut prefix = PrefixId::IDLE;
        for sig in init {
            let next = self.interner.extend(prefix, *sig);
            self.insert_all(
                scopes,
                modes,
                prefix,
                *sig,
                &Entry::Partial {
                    next,
                    workflow: workflow.clone(),
                },
            );
            prefix = next;
        }
        self.insert_all(scopes, modes, prefix, *last, &Entry::Exact(workflow.clone()));
        for scope in scopes {
            self.listing.push(ListingEntry {
                scope: *scope,
                chord: sigs.clone(),
                workflow: workflow.clone(),
            });
        }
        true
    }

    fn insert_all(
        &mut self,
        scopes: &[ScopeId],
        modes: &[Option<ModeId>],
        prefix: PrefixId,
        signature: Signature,
        entry: &Entry,
    ) {
        for scope in scopes {
            for mode in modes {
                let key = CacheKey {
                    scope: *scope,
                    prefix,
                    signature,
                    mode: *mode,
                };
                self.entries.insert(key, entry.clone());
            }
        }
    }

    /// Resolve `event` against the cache.
    ///
    /// Probe order: app scope with each active mode, global scope with each
    /// active mode, app scope without mode, global scope without mode. At
    /// each probe the left/right-specific signature is tried before the
    /// generic one. The first hit wins.
    pub fn lookup(&self, ctx: &LookupContext, prefix: PrefixId, event: &EventKey) -> MatchResult {
        let specific = event.signature(true);
        let generic = event.signature(false);
        let app = ctx.app.as_deref().and_then(|a| self.interner.find_scope(a));
        let modes: Vec<ModeId> = ctx
            .modes
            .iter()
            .filter_map(|m| self.interner.find_mode(m))
            .collect();

        let mut probes: Vec<(ScopeId, Option<ModeId>)> = Vec::with_capacity(2 * modes.len() + 2);
        if let Some(app) = app {
            probes.extend(modes.iter().map(|m| (app, Some(*m))));
        }
        probes.extend(modes.iter().map(|m| (ScopeId::GLOBAL, Some(*m))));
        if let Some(app) = app {
            probes.push((app, None));
        }
        probes.push((ScopeId::GLOBAL, None));

        for (scope, mode) in probes {
            for signature in [specific, generic] {
                let key = CacheKey {
                    scope,
                    prefix,
                    signature,
                    mode,
                };
                if let Some(entry) = self.entries.get(&key) {
                    trace!("cache hit {} at {:?}", signature, key);
                    return match entry {
                        Entry::Partial { next, workflow } => MatchResult::PartialMatch {
                            prefix: *next,
                            workflow: workflow.clone(),
                        },
                        Entry::Exact(w) => MatchResult::ExactMatch(w.clone()),
                    };
                }
                if specific == generic {
                    break;
                }
            }
        }
        MatchResult::None
    }

    /// Every chord registered for `app` (then globally) that starts with `text`.
    ///
    /// `text` is a space-separated list of chord elements such as
    /// `"cmd+k a"`; an empty string lists everything.
    pub fn prefix_listing(&self, app: Option<&str>, text: &str) -> Vec<PrefixListing> {
        let app = app.and_then(|a| self.interner.find_scope(a));
        let wanted: Vec<&str> = text.split_whitespace().collect();
        let mut out = Vec::new();
        let tiers = app.into_iter().chain([ScopeId::GLOBAL]);
        for scope in tiers {
            for entry in self.listing.iter().filter(|e| e.scope == scope) {
                if let Some(l) = entry.matching(&wanted) {
                    out.push(l);
                }
            }
        }
        out
    }

    /// Canonical text of `prefix`, e.g. `"cmd+k a"`; empty for idle.
    pub fn prefix_text(&self, prefix: PrefixId) -> String {
        render(self.interner.path(prefix))
    }

    /// Number of cache entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no trigger is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
