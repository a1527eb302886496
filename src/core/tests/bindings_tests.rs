// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Key binding edit tests

use crate::core::{
    bindings::*,
    types::{EventType, KeyBinding},
    validator::ValidationError,
};

#[test]
fn test_add_creates_four_default_scripts() {
    let mut set = KeyBindingSet::new();
    let changes = set.add(735).unwrap();

    assert_eq!(changes.len(), 4);
    assert!(changes
        .iter()
        .all(|c| matches!(c, ScriptChange::Create { code: 735, .. })));
    assert_eq!(
        changes.iter().map(ScriptChange::file_name).collect::<Vec<_>>(),
        vec![
            "click_735.sh",
            "double_click_735.sh",
            "short_press_735.sh",
            "long_press_735.sh",
        ]
    );
    assert_eq!(
        set.get(735).and_then(|b| b.script(EventType::LongPress)),
        Some("long_press_735.sh")
    );
}

#[test]
fn test_add_rejects_duplicates_and_bad_codes() {
    let mut set = KeyBindingSet::new();
    set.add(115).unwrap();

    assert_eq!(set.add(115), Err(BindingError::DuplicateKey(115)));
    assert_eq!(
        set.add(0),
        Err(BindingError::Invalid(ValidationError::InvalidKeyCode(0)))
    );
    assert_eq!(set.len(), 1);
}

#[test]
fn test_remove_deletes_all_scripts() {
    let mut set = KeyBindingSet::new();
    set.add(735).unwrap();

    let changes = set.remove(735).unwrap();
    assert!(set.is_empty());
    assert_eq!(changes.len(), 4);
    assert!(changes
        .iter()
        .all(|c| matches!(c, ScriptChange::Delete { code: 735, .. })));

    assert_eq!(set.remove(735), Err(BindingError::UnknownKey(735)));
}

#[test]
fn test_disable_event_drops_line_and_file() {
    let mut set = KeyBindingSet::new();
    set.add(735).unwrap();

    let change = set.set_event(735, EventType::ShortPress, false).unwrap();
    assert_eq!(
        change,
        ScriptChange::Delete {
            code: 735,
            event: EventType::ShortPress
        }
    );
    assert!(!set
        .script_lines()
        .iter()
        .any(|l| l.starts_with("script_735_short_press=")));
    assert_eq!(set.script_lines().len(), 3);
}

#[test]
fn test_enable_event_keeps_custom_name() {
    let mut binding = KeyBinding::new(115);
    binding
        .scripts
        .insert(EventType::Click, "torch.sh".to_string());
    let mut set = KeyBindingSet::from(vec![binding]);

    set.set_event(115, EventType::Click, true).unwrap();
    set.set_event(115, EventType::LongPress, true).unwrap();

    let binding = set.get(115).unwrap();
    assert_eq!(binding.script(EventType::Click), Some("torch.sh"));
    assert_eq!(binding.script(EventType::LongPress), Some("long_press_115.sh"));
}

#[test]
fn test_sync_changes_mirror_mappings() {
    let mut set = KeyBindingSet::new();
    set.add(735).unwrap();
    set.set_event(735, EventType::DoubleClick, false).unwrap();

    let changes = set.sync_changes(735).unwrap();
    assert_eq!(
        changes,
        vec![
            ScriptChange::Create { code: 735, event: EventType::Click },
            ScriptChange::Delete { code: 735, event: EventType::DoubleClick },
            ScriptChange::Create { code: 735, event: EventType::ShortPress },
            ScriptChange::Create { code: 735, event: EventType::LongPress },
        ]
    );
}

#[test]
fn test_from_merges_duplicate_codes() {
    let mut first = KeyBinding::new(1);
    first.scripts.insert(EventType::Click, "a.sh".to_string());
    let mut second = KeyBinding::new(1);
    second.scripts.insert(EventType::LongPress, "b.sh".to_string());

    let set = KeyBindingSet::from(vec![first, second]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(1).map(|b| b.scripts.len()), Some(2));
}
