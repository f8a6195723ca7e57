#[cfg(test)]
mod tests {
    use std::{env, fs, path::PathBuf, process};

    use mac_keycode::{Flags, Key};

    use crate::*;

    const SAMPLE: &str = r#"(
        groups: [
            (
                id: "global",
                workflows: [
                    (
                        id: "chord",
                        name: "A then B",
                        trigger: keyboard(shortcuts: ["a", "b"]),
                        commands: [(id: "c1", kind: script("echo hi"))],
                    ),
                    (
                        id: "leader",
                        trigger: keyboard(
                            shortcuts: [(key: "rcmd+space", left_right_specific: true)],
                            hold_duration: 0.3,
                            leader_key: true,
                        ),
                    ),
                ],
            ),
            (
                id: "term",
                rule: (bundle_identifiers: ["com.apple.Terminal"]),
                user_modes: [(id: "nav", name: "Navigation")],
                workflows: [
                    (
                        id: "caps",
                        trigger: keyboard(shortcuts: ["caps"]),
                        commands: [(id: "esc", kind: keyboard(keys: ["esc"]))],
                    ),
                    (
                        id: "mods",
                        enabled: false,
                        trigger: modifiers(modifiers: ["cmd", "opt"]),
                    ),
                ],
            ),
        ],
    )"#;

    #[test]
    fn parses_sample_ron() {
        let cfg = from_ron(SAMPLE).unwrap();
        assert_eq!(cfg.groups.len(), 2);
        assert_eq!(cfg.workflows().count(), 4);

        let chord = &cfg.groups[0].workflows[0];
        let kb = chord.trigger().and_then(Trigger::as_keyboard).unwrap();
        assert_eq!(kb.shortcuts, vec![Shortcut::new("a"), Shortcut::new("b")]);
        assert!(!chord.conditions().is_repeat_safe);

        let leader = &cfg.groups[0].workflows[1];
        assert!(leader.conditions().is_leader_key);
        assert!(leader.conditions().has_hold_duration);
        let kb = leader.trigger().and_then(Trigger::as_keyboard).unwrap();
        let key = kb.shortcuts[0].event_key().unwrap();
        assert_eq!(key.key(), Some(Key::Space));
        assert!(key.flags().contains(Flags::RIGHT_COMMAND));

        let term = &cfg.groups[1];
        assert_eq!(term.bundle_identifiers(), ["com.apple.Terminal".to_string()]);
        assert_eq!(term.user_modes[0].id, UserModeId::from("nav"));
        let caps = &term.workflows[0];
        assert_eq!(
            caps.conditions().rebind_target.and_then(|k| k.key()),
            Some(Key::Escape)
        );
        assert!(!term.workflows[1].enabled());
        assert_eq!(*term.workflows[1].conditions(), ConditionRecord::default());
    }

    #[test]
    fn json_matches_ron() {
        let cfg = from_ron(SAMPLE).unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(from_json(&json).unwrap(), cfg);
    }

    #[test]
    fn parse_error_has_location() {
        let src = "(\n  groups: [\n    (id: 3),\n  ],\n)";
        match from_ron(src) {
            Err(Error::Parse { line, excerpt, .. }) => {
                assert_eq!(line, 3);
                assert!(excerpt.contains("(id: 3)"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_field_is_rejected() {
        let src = r#"(groups: [(id: "g", workflows: [(id: "w", bogus: true)])])"#;
        assert!(matches!(from_ron(src), Err(Error::Parse { .. })));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let src = r#"(groups: [
            (id: "g1", workflows: [(id: "w")]),
            (id: "g2", workflows: [(id: "w")]),
        ])"#;
        let err = from_ron(src).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("duplicate workflow id 'w'"));
    }

    #[test]
    fn bad_triggers_are_rejected() {
        let negative = r#"(groups: [(id: "g", workflows: [
            (id: "w", trigger: keyboard(shortcuts: ["a"], hold_duration: -1.0)),
        ])])"#;
        assert!(matches!(from_ron(negative), Err(Error::Validation { .. })));

        let empty = r#"(groups: [(id: "g", workflows: [
            (id: "w", trigger: keyboard(shortcuts: [])),
        ])])"#;
        assert!(matches!(from_ron(empty), Err(Error::Validation { .. })));
    }

    #[test]
    fn unresolved_shortcuts_are_reported() {
        let src = r#"(groups: [(id: "g", workflows: [
            (id: "w", trigger: keyboard(shortcuts: ["a", "cmd+nokey"])),
        ])])"#;
        let cfg = from_ron(src).unwrap();
        assert_eq!(cfg.unresolved_shortcuts(), vec![("w", "cmd+nokey")]);
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = env::temp_dir().join(format!("keyflow-config-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();

        let ron_path = dir.join("c.ron");
        fs::write(&ron_path, SAMPLE).unwrap();
        let cfg = load_from_path(&ron_path).unwrap();

        let json_path = dir.join("c.json");
        fs::write(&json_path, serde_json::to_string(&cfg).unwrap()).unwrap();
        assert_eq!(load_from_path(&json_path).unwrap(), cfg);

        let other = PathBuf::from("/nonexistent/c.toml");
        assert!(matches!(load_from_path(&other), Err(Error::Read { .. })));

        let bad = dir.join("bad.ron");
        fs::write(&bad, "(groups: [").unwrap();
        let err = load_from_path(&bad).unwrap_err();
        assert_eq!(err.path(), Some(bad.as_path()));

        let _ignored = fs::remove_dir_all(&dir);
    }
}
