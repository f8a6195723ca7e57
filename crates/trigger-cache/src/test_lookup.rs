use config::{
    KeyboardTrigger, ModifierTrigger, Rule, Shortcut, Trigger, UserMode, UserModeId, Workflow,
    WorkflowGroup,
};
use mac_keycode::{EventKey, Flags};
use proptest::prelude::*;

use crate::*;

fn wf(id: &str, keys: &[&str]) -> Workflow {
    let shortcuts = keys.iter().map(|k| Shortcut::new(*k)).collect();
    Workflow::new(
        id,
        "",
        Some(Trigger::Keyboard(KeyboardTrigger::new(shortcuts))),
        vec![],
    )
}

fn specific_wf(id: &str, key: &str) -> Workflow {
    Workflow::new(
        id,
        "",
        Some(Trigger::Keyboard(KeyboardTrigger::new(vec![
            Shortcut::specific(key),
        ]))),
        vec![],
    )
}

fn app_group(id: &str, app: &str, workflows: Vec<Workflow>) -> WorkflowGroup {
    let mut g = WorkflowGroup::new(id, workflows);
    g.rule = Some(Rule {
        bundle_identifiers: vec![app.to_string()],
    });
    g
}

/// An event as the OS reports it: side bits set alongside generic bits.
fn ev(spec: &str) -> EventKey {
    EventKey::parse(spec, true).expect("valid spec")
}

fn exact_id(r: &MatchResult) -> Option<&str> {
    match r {
        MatchResult::ExactMatch(w) => Some(w.id()),
        _ => None,
    }
}

fn partial(r: &MatchResult) -> Option<(PrefixId, &str)> {
    match r {
        MatchResult::PartialMatch { prefix, workflow } => Some((*prefix, workflow.id())),
        _ => None,
    }
}

#[test]
fn two_key_chord() {
    let cache = TriggerCache::build(&[WorkflowGroup::new("g", vec![wf("ab", &["a", "b"])])]);
    let ctx = LookupContext::default();

    let first = cache.lookup(&ctx, PrefixId::IDLE, &ev("a"));
    let (p, id) = partial(&first).expect("partial");
    assert_eq!(id, "ab");
    assert!(!p.is_idle());
    assert_eq!(cache.prefix_text(p), "a");

    assert_eq!(exact_id(&cache.lookup(&ctx, p, &ev("b"))), Some("ab"));
    assert!(cache.lookup(&ctx, p, &ev("c")).is_none());
    // The second element is not registered on its own.
    assert!(cache.lookup(&ctx, PrefixId::IDLE, &ev("b")).is_none());
}

#[test]
fn empty_configuration_never_matches() {
    let cache = TriggerCache::build(&[]);
    assert!(cache.is_empty());
    assert_eq!(cache.len(), 0);
    let ctx = LookupContext::for_app("com.example.app");
    for spec in ["a", "cmd+k", "esc", "shift+2"] {
        assert!(cache.lookup(&ctx, PrefixId::IDLE, &ev(spec)).is_none());
    }
}

#[test]
fn app_scope_beats_global() {
    let cache = TriggerCache::build(&[
        WorkflowGroup::new("g", vec![wf("global", &["a"])]),
        app_group("t", "com.apple.Terminal", vec![wf("term", &["a"])]),
    ]);
    let term = LookupContext::for_app("com.apple.Terminal");
    let other = LookupContext::for_app("com.apple.Safari");
    assert_eq!(
        exact_id(&cache.lookup(&term, PrefixId::IDLE, &ev("a"))),
        Some("term")
    );
    assert_eq!(
        exact_id(&cache.lookup(&other, PrefixId::IDLE, &ev("a"))),
        Some("global")
    );
    assert_eq!(
        exact_id(&cache.lookup(&LookupContext::default(), PrefixId::IDLE, &ev("a"))),
        Some("global")
    );
}

#[test]
fn mode_entries_take_priority_over_app_scope() {
    let mut modal = WorkflowGroup::new("m", vec![wf("global-nav", &["j"])]);
    modal.user_modes = vec![UserMode {
        id: UserModeId::from("nav"),
        name: String::new(),
    }];
    let cache = TriggerCache::build(&[
        modal,
        app_group("t", "com.apple.Terminal", vec![wf("term", &["j"])]),
    ]);

    let mut ctx = LookupContext::for_app("com.apple.Terminal");
    assert_eq!(
        exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &ev("j"))),
        Some("term")
    );
    ctx.modes = vec![UserModeId::from("nav")];
    assert_eq!(
        exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &ev("j"))),
        Some("global-nav")
    );
    // Unknown modes are ignored.
    ctx.modes = vec![UserModeId::from("missing")];
    assert_eq!(
        exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &ev("j"))),
        Some("term")
    );
}

#[test]
fn mode_groups_also_register_without_mode() {
    let mut modal = WorkflowGroup::new("m", vec![wf("nav", &["j"])]);
    modal.user_modes = vec![UserMode {
        id: UserModeId::from("nav"),
        name: String::new(),
    }];
    let cache = TriggerCache::build(&[modal]);
    assert_eq!(
        exact_id(&cache.lookup(&LookupContext::default(), PrefixId::IDLE, &ev("j"))),
        Some("nav")
    );
}

#[test]
fn side_specific_before_generic() {
    let cache = TriggerCache::build(&[WorkflowGroup::new(
        "g",
        vec![wf("generic", &["cmd+k"]), specific_wf("right", "rcmd+k")],
    )]);
    let ctx = LookupContext::default();
    assert_eq!(
        exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &ev("rcmd+k"))),
        Some("right")
    );
    assert_eq!(
        exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &ev("cmd+k"))),
        Some("generic")
    );
    let bare = EventKey::new(ev("k").key_code(), Flags::COMMAND);
    assert_eq!(
        exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &bare)),
        Some("generic")
    );
}

#[test]
fn last_write_wins() {
    let cache = TriggerCache::build(&[
        WorkflowGroup::new("g1", vec![wf("first", &["a"]), wf("second", &["a"])]),
        WorkflowGroup::new("g2", vec![wf("third", &["x"])]),
    ]);
    assert_eq!(
        exact_id(&cache.lookup(&LookupContext::default(), PrefixId::IDLE, &ev("a"))),
        Some("second")
    );
}

#[test]
fn disabled_and_unresolvable_are_skipped() {
    let mut off = wf("off", &["a"]);
    off.set_enabled(false);
    let mut group_off = WorkflowGroup::new("g2", vec![wf("group-off", &["b"])]);
    group_off.disabled = true;
    let cache = TriggerCache::build(&[
        WorkflowGroup::new("g1", vec![off, wf("bad", &["c", "cmd+nokey"]), wf("ok", &["d"])]),
        group_off,
    ]);
    let ctx = LookupContext::default();
    assert!(cache.lookup(&ctx, PrefixId::IDLE, &ev("a")).is_none());
    assert!(cache.lookup(&ctx, PrefixId::IDLE, &ev("b")).is_none());
    assert!(cache.lookup(&ctx, PrefixId::IDLE, &ev("c")).is_none());
    assert_eq!(exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &ev("d"))), Some("ok"));
}

#[test]
fn modifier_only_trigger() {
    let mods = Workflow::new(
        "mods",
        "",
        Some(Trigger::Modifiers(ModifierTrigger {
            modifiers: vec!["cmd".into(), "opt".into()],
            left_right_specific: false,
            passthrough: true,
        })),
        vec![],
    );
    let cache = TriggerCache::build(&[WorkflowGroup::new("g", vec![mods])]);
    let ctx = LookupContext::default();
    let held = EventKey::modifiers_only(
        Flags::COMMAND | Flags::LEFT_COMMAND | Flags::OPTION | Flags::RIGHT_OPTION,
    );
    assert_eq!(exact_id(&cache.lookup(&ctx, PrefixId::IDLE, &held)), Some("mods"));
    let partial_held = EventKey::modifiers_only(Flags::COMMAND);
    assert!(cache.lookup(&ctx, PrefixId::IDLE, &partial_held).is_none());
}

#[test]
fn implicit_fn_flag_is_ignored() {
    let cache = TriggerCache::build(&[WorkflowGroup::new("g", vec![wf("left", &["left"])])]);
    let arrow = EventKey::new(ev("left").key_code(), Flags::FUNCTION | Flags::NUMERIC_PAD);
    assert_eq!(
        exact_id(&cache.lookup(&LookupContext::default(), PrefixId::IDLE, &arrow)),
        Some("left")
    );
}

#[test]
fn chords_share_prefixes_across_scopes() {
    let cache = TriggerCache::build(&[
        WorkflowGroup::new("g", vec![wf("ka", &["cmd+k", "a"])]),
        app_group("t", "com.apple.Terminal", vec![wf("kb", &["cmd+k", "b"])]),
    ]);
    let ctx = LookupContext::for_app("com.apple.Terminal");
    let first = cache.lookup(&ctx, PrefixId::IDLE, &ev("cmd+k"));
    let (p, id) = partial(&first).expect("partial");
    assert_eq!(id, "kb");
    assert_eq!(exact_id(&cache.lookup(&ctx, p, &ev("b"))), Some("kb"));
    assert_eq!(exact_id(&cache.lookup(&ctx, p, &ev("a"))), Some("ka"));
}

#[test]
fn prefix_listing_orders_app_first_and_trims() {
    let cache = TriggerCache::build(&[
        WorkflowGroup::new("g", vec![wf("ka", &["cmd+k", "a"]), wf("kb", &["cmd+k", "b"])]),
        app_group("t", "com.apple.Terminal", vec![wf("kc", &["cmd+k", "c"])]),
        WorkflowGroup::new("h", vec![wf("x", &["x"])]),
    ]);

    let l = cache.prefix_listing(Some("com.apple.Terminal"), "k+cmd");
    assert!(l.is_empty());

    let l = cache.prefix_listing(Some("com.apple.Terminal"), "shift+cmd+k");
    assert!(l.is_empty());

    let l = cache.prefix_listing(Some("com.apple.Terminal"), "cmd+k");
    let got: Vec<(&str, bool, &str)> = l
        .iter()
        .map(|p| (p.workflow.id(), p.global, p.remaining.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![("kc", false, "c"), ("ka", true, "a"), ("kb", true, "b")]
    );
    assert_eq!(l[0].chord, "cmd+k c");

    // Without the app, only global chords are listed.
    let all = cache.prefix_listing(None, "");
    let ids: Vec<&str> = all.iter().map(|p| p.workflow.id()).collect();
    assert_eq!(ids, vec!["ka", "kb", "x"]);
    assert_eq!(all[2].remaining, "x");
}

proptest! {
    #[test]
    fn unregistered_keys_never_match(code in 0u16..0x80, bits in any::<u64>()) {
        let cache = TriggerCache::build(&[WorkflowGroup::new("g", vec![wf("a", &["cmd+a"])])]);
        let event = EventKey::new(code, Flags::from_bits_retain(bits));
        let is_cmd_a = code == ev("a").key_code()
            && event.signature(false) == ev("cmd+a").signature(false);
        let r = cache.lookup(&LookupContext::default(), PrefixId::IDLE, &event);
        prop_assert_eq!(r.is_none(), !is_cmd_a);
    }
}
