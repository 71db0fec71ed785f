//! Replace the current selection of a window with transformed text.

use crate::error::{BoxError, ReplaceError};
use crate::window::{
    Address, CTL_ADDR_DOT, CTL_DOT_ADDR, DATA_FILE, EditorClient, EditorWindow,
};

/// Replace the selection in window `win_id` with `transform(selection)` and
/// select the new text.
///
/// The window body is untouched unless the transformation succeeds. Each
/// editor round trip that fails aborts the call; nothing already written is
/// rolled back (see [`ReplaceError::may_have_modified_buffer`]).
///
/// # Errors
/// Returns a [`ReplaceError`] naming the step that failed. An empty selection
/// is [`ReplaceError::EmptySelection`].
pub fn replace_selection<C, F, E>(client: &C, win_id: usize, transform: F) -> Result<(), ReplaceError>
where
    C: EditorClient,
    F: FnOnce(&str) -> Result<String, E>,
    E: Into<BoxError>,
{
    let mut win = client
        .open(win_id)
        .map_err(|e| ReplaceError::WindowOpen {
            win_id,
            source: e.into(),
        })?;

    // The first addr read resets it; do that before the selection read moves it.
    win.read_addr()
        .map_err(|e| ReplaceError::AddressRead { source: e.into() })?;

    let selection = win
        .selection()
        .map_err(|e| ReplaceError::SelectionRead { source: e.into() })?;
    if selection.is_empty() {
        return Err(ReplaceError::EmptySelection);
    }

    let replacement =
        transform(&selection).map_err(|e| ReplaceError::Transform { source: e.into() })?;

    // Reading the selection left addr collapsed at its end.
    let addr = win
        .read_addr()
        .map_err(|e| ReplaceError::AddressRead { source: e.into() })?;
    let selection_len = win.text_len(&selection);
    let start = addr
        .q1
        .checked_sub(selection_len)
        .ok_or(ReplaceError::InconsistentAddress {
            addr,
            selection_len,
        })?;
    let target = Address::new(start, start + win.text_len(&replacement));
    tracing::debug!(win_id, selected = %Address::new(start, addr.q1), %target, "replacing selection");

    win.ctl(CTL_ADDR_DOT).map_err(|e| ReplaceError::Ctl {
        command: CTL_ADDR_DOT,
        source: e.into(),
    })?;

    win.write(DATA_FILE, replacement.as_bytes())
        .map_err(|e| ReplaceError::Write { source: e.into() })?;

    let expr = target.to_string();
    win.addr(&expr).map_err(|e| ReplaceError::AddressSet {
        expr: expr.clone(),
        source: e.into(),
    })?;

    win.ctl(CTL_DOT_ADDR).map_err(|e| ReplaceError::Ctl {
        command: CTL_DOT_ADDR,
        source: e.into(),
    })?;

    tracing::info!(win_id, %target, "replaced selection");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::error::Error;

    use super::*;
    use crate::error::Step;
    use crate::window::{Addressing, Fault, MemoryEditor, Op};

    fn editor_with(text: &str, dot: Address) -> (MemoryEditor, usize) {
        let editor = MemoryEditor::new();
        let id = editor.create_window(text);
        editor.set_dot(id, dot).unwrap();
        (editor, id)
    }

    fn upper(s: &str) -> Result<String, Infallible> {
        Ok(s.to_uppercase())
    }

    #[test]
    fn test_uppercases_selection_and_reselects() {
        let (editor, id) = editor_with("say hello there", Address::new(4, 9));
        replace_selection(&editor, id, upper).unwrap();
        assert_eq!(editor.body(id).unwrap(), "say HELLO there");
        assert_eq!(editor.dot(id), Some(Address::new(4, 9)));
    }

    #[test]
    fn test_longer_replacement_extends_selection() {
        let (editor, id) = editor_with("a b c", Address::new(2, 3));
        replace_selection(&editor, id, |s| Ok::<_, Infallible>(format!("[{s}]"))).unwrap();
        assert_eq!(editor.body(id).unwrap(), "a [b] c");
        assert_eq!(editor.dot(id), Some(Address::new(2, 5)));
    }

    #[test]
    fn test_shorter_replacement_shrinks_selection() {
        let (editor, id) = editor_with("keep remove keep", Address::new(5, 12));
        replace_selection(&editor, id, |_| Ok::<_, Infallible>("x".to_string())).unwrap();
        assert_eq!(editor.body(id).unwrap(), "keep xkeep");
        assert_eq!(editor.dot(id), Some(Address::new(5, 6)));
    }

    #[test]
    fn test_multibyte_selection_uses_character_offsets() {
        let (editor, id) = editor_with("→ café ←", Address::new(2, 6));
        replace_selection(&editor, id, upper).unwrap();
        assert_eq!(editor.body(id).unwrap(), "→ CAFÉ ←");
        assert_eq!(editor.dot(id), Some(Address::new(2, 6)));
    }

    #[test]
    fn test_byte_addressed_window_uses_byte_offsets() {
        let editor = MemoryEditor::new();
        let id = editor.create_window_with("→ café ←", Addressing::Bytes);
        editor.set_dot(id, Address::new(4, 9)).unwrap();
        replace_selection(&editor, id, |s| Ok::<_, Infallible>(s.replace('é', "e"))).unwrap();
        assert_eq!(editor.body(id).unwrap(), "→ cafe ←");
        assert_eq!(editor.dot(id), Some(Address::new(4, 8)));

        replace_selection(&editor, id, upper).unwrap();
        assert_eq!(editor.body(id).unwrap(), "→ CAFE ←");
        assert_eq!(editor.dot(id), Some(Address::new(4, 8)));
    }

    #[test]
    fn test_replace_after_text_before_selection_is_deleted() {
        let (editor, id) = editor_with("hello world", Address::new(6, 11));
        let mut win = editor.open(id).unwrap();
        win.addr("#0,#6").unwrap();
        win.write(DATA_FILE, b"").unwrap();
        drop(win);

        replace_selection(&editor, id, upper).unwrap();
        assert_eq!(editor.body(id).unwrap(), "WORLD");
        assert_eq!(editor.dot(id), Some(Address::new(0, 5)));
    }

    #[test]
    fn test_retry_after_failed_address_set_does_not_panic() {
        let (editor, id) = editor_with("hello world", Address::new(6, 11));
        editor.inject(Fault::on(Op::Addr));
        let err = replace_selection(&editor, id, |_| Ok::<_, Infallible>("x".to_string()))
            .unwrap_err();
        assert_eq!(err.step(), Step::SetAddress);
        assert_eq!(editor.body(id).unwrap(), "hello x");
        assert_eq!(editor.dot(id), Some(Address::new(6, 6)));

        let err = replace_selection(&editor, id, upper).unwrap_err();
        assert!(matches!(err, ReplaceError::EmptySelection));
        assert_eq!(editor.body(id).unwrap(), "hello x");
    }

    #[test]
    fn test_empty_selection_fails_without_writing() {
        let (editor, id) = editor_with("hello", Address::new(2, 2));
        let err = replace_selection(&editor, id, upper).unwrap_err();
        assert!(matches!(err, ReplaceError::EmptySelection));
        assert_eq!(editor.body(id).unwrap(), "hello");
        assert!(!editor.journal().contains(&Op::Write));
    }

    #[test]
    fn test_transform_error_is_wrapped_without_writing() {
        let (editor, id) = editor_with("hello", Address::new(0, 5));
        let err = replace_selection(&editor, id, |_| Err::<String, _>("bad input")).unwrap_err();
        assert!(matches!(err, ReplaceError::Transform { .. }));
        assert_eq!(err.source().unwrap().to_string(), "bad input");
        assert_eq!(editor.body(id).unwrap(), "hello");
        assert_eq!(editor.is_dirty(id), Some(false));
        assert!(!editor.journal().contains(&Op::Write));
    }

    #[test]
    fn test_missing_window() {
        let editor = MemoryEditor::new();
        let err = replace_selection(&editor, 42, upper).unwrap_err();
        assert!(matches!(err, ReplaceError::WindowOpen { win_id: 42, .. }));
    }

    #[test]
    fn test_transform_not_called_for_empty_selection() {
        let (editor, id) = editor_with("hello", Address::new(0, 0));
        let mut called = false;
        let _ = replace_selection(&editor, id, |s| {
            called = true;
            Ok::<_, Infallible>(s.to_string())
        });
        assert!(!called);
    }

    #[test]
    fn test_protocol_order() {
        let (editor, id) = editor_with("hello", Address::new(0, 5));
        replace_selection(&editor, id, upper).unwrap();
        assert_eq!(
            editor.journal(),
            vec![
                Op::Open,
                Op::ReadAddr,
                Op::Selection,
                Op::ReadAddr,
                Op::Ctl,
                Op::Write,
                Op::Addr,
                Op::Ctl,
            ]
        );
    }

    #[test]
    fn test_each_failing_call_names_its_step() {
        let cases = [
            (Fault::on(Op::Open), Step::OpenWindow, false),
            (Fault::on(Op::ReadAddr), Step::ReadAddress, false),
            (Fault::on(Op::ReadAddr).after(1), Step::ReadAddress, false),
            (Fault::on(Op::Selection), Step::ReadSelection, false),
            (Fault::on(Op::Ctl), Step::Control, false),
            (Fault::on(Op::Write), Step::WriteData, false),
            (Fault::on(Op::Addr), Step::SetAddress, true),
            (Fault::on(Op::Ctl).after(1), Step::Control, true),
        ];
        for (fault, step, written) in cases {
            let (editor, id) = editor_with("hello", Address::new(0, 5));
            editor.inject(fault);
            let err = replace_selection(&editor, id, upper).unwrap_err();
            assert_eq!(err.step(), step, "{fault:?}");
            assert!(err.source().is_some(), "{fault:?}");
            let body = editor.body(id).unwrap();
            assert_eq!(body == "HELLO", written, "{fault:?}");
        }
    }

    #[test]
    fn test_unprimed_address_would_be_stale() {
        // Without the priming read, the second read is the first one and
        // returns #0,#0; the replacement then cannot be located.
        let (editor, id) = editor_with("hello", Address::new(0, 5));
        let mut win = editor.open(id).unwrap();
        let selection = win.selection().unwrap();
        let addr = win.read_addr().unwrap();
        assert!(addr.q1.checked_sub(win.text_len(&selection)).is_none());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn split(text: &str, a: usize, b: usize) -> Address {
            let n = text.chars().count();
            let (a, b) = (a % (n + 1), b % (n + 1));
            Address::new(a.min(b), a.max(b))
        }

        proptest! {
            #[test]
            fn replaced_region_holds_transform_and_is_selected(
                text in "[a-zé→ \n]{1,40}",
                a in 0..64usize,
                b in 0..64usize,
                suffix in "[A-Z]{0,5}",
            ) {
                let dot = split(&text, a, b);
                prop_assume!(!dot.is_empty());
                let (editor, id) = editor_with(&text, dot);

                replace_selection(&editor, id, |s| Ok::<_, Infallible>(format!("{s}{suffix}")))
                    .unwrap();

                let chars: Vec<char> = text.chars().collect();
                let before: String = chars[..dot.q0].iter().collect();
                let selected: String = chars[dot.q0..dot.q1].iter().collect();
                let after: String = chars[dot.q1..].iter().collect();
                let replacement = format!("{selected}{suffix}");

                prop_assert_eq!(
                    editor.body(id).unwrap(),
                    format!("{before}{replacement}{after}")
                );
                let new_dot = editor.dot(id).unwrap();
                prop_assert_eq!(new_dot.q0, dot.q0);
                prop_assert_eq!(new_dot.len(), replacement.chars().count());
            }

            #[test]
            fn idempotent_transform_applied_twice_matches_once(
                text in "[a-zA-Z \n]{1,40}",
                a in 0..64usize,
                b in 0..64usize,
            ) {
                let dot = split(&text, a, b);
                prop_assume!(!dot.is_empty());

                let (once, id1) = editor_with(&text, dot);
                replace_selection(&once, id1, upper).unwrap();

                let (twice, id2) = editor_with(&text, dot);
                replace_selection(&twice, id2, upper).unwrap();
                replace_selection(&twice, id2, upper).unwrap();

                prop_assert_eq!(once.body(id1), twice.body(id2));
                prop_assert_eq!(once.dot(id1), twice.dot(id2));
            }
        }
    }
}
