use super::*;

fn key(name: &str) -> Key {
    Key(name.to_owned())
}

fn ctrl() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

fn meta() -> Modifiers {
    Modifiers { meta: true, ..Default::default() }
}

#[test]
fn default_tool_is_pen() {
    assert_eq!(Tool::default(), Tool::Pen);
}

#[test]
fn tool_classification() {
    assert!(Tool::Pen.is_stroke());
    assert!(Tool::Eraser.is_stroke());
    assert!(!Tool::Select.is_stroke());
    assert!(Tool::Shape(ShapeName::Star).is_placement());
    assert!(Tool::Text.is_placement());
    assert!(!Tool::Pen.is_placement());
}

#[test]
fn delete_key_deletes() {
    assert_eq!(Shortcut::from_key(&key("Delete"), Modifiers::default()), Some(Shortcut::DeleteSelection));
}

#[test]
fn backspace_needs_meta() {
    assert_eq!(Shortcut::from_key(&key("Backspace"), Modifiers::default()), None);
    assert_eq!(Shortcut::from_key(&key("Backspace"), meta()), Some(Shortcut::DeleteSelection));
}

#[test]
fn undo_chords() {
    assert_eq!(Shortcut::from_key(&key("z"), ctrl()), Some(Shortcut::Undo));
    assert_eq!(Shortcut::from_key(&key("z"), meta()), Some(Shortcut::Undo));
    assert_eq!(Shortcut::from_key(&key("z"), Modifiers::default()), None);
}

#[test]
fn redo_chords() {
    assert_eq!(Shortcut::from_key(&key("y"), ctrl()), Some(Shortcut::Redo));
    let meta_shift = Modifiers { meta: true, shift: true, ..Default::default() };
    assert_eq!(Shortcut::from_key(&key("z"), meta_shift), Some(Shortcut::Redo));
    assert_eq!(Shortcut::from_key(&key("y"), meta()), None);
}

#[test]
fn plain_letters_are_not_shortcuts() {
    assert_eq!(Shortcut::from_key(&key("a"), ctrl()), None);
    assert_eq!(Shortcut::from_key(&key("Escape"), Modifiers::default()), None);
}
