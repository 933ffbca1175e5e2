//! Suppresses repeated processing of an unchanged dialog.
//!
//! Detection sources re-report a dialog on every observation cycle for as
//! long as it stays on screen. The deduplicator remembers the key of the one
//! most recently accepted dialog and rejects exact repeats. It deliberately
//! keeps no history beyond that single slot, and nothing is persisted across
//! restarts.

use crate::dialog::types::DialogSnapshot;
use sha2::{Digest, Sha256};
use std::sync::Mutex;

/// Stable hash of the fields that identify a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupKey([u8; 32]);

impl DedupKey {
    /// Derives the key from `(source_app, prompt_text, options)`. Window
    /// title and capture time are excluded so a lingering dialog hashes the
    /// same across cycles.
    pub fn for_snapshot(snapshot: &DialogSnapshot) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(snapshot.source_app.as_bytes());
        hasher.update([0x1f]);
        hasher.update(snapshot.prompt_text.as_bytes());
        for option in &snapshot.options {
            hasher.update([0x1f]);
            hasher.update(option.as_bytes());
        }
        Self(hasher.finalize().into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupVerdict {
    /// Not the dialog seen on the previous accepted cycle; process it.
    Fresh,
    /// Same dialog as the previous accepted cycle; drop it.
    Repeat,
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    last: Mutex<Option<DedupKey>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares the snapshot against the last accepted dialog and claims the
    /// slot when it differs.
    pub fn check(&self, snapshot: &DialogSnapshot) -> DedupVerdict {
        let key = DedupKey::for_snapshot(snapshot);
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if last.as_ref() == Some(&key) {
            return DedupVerdict::Repeat;
        }
        *last = Some(key);
        DedupVerdict::Fresh
    }

    /// Forgets the last accepted dialog, e.g. when observation restarts.
    pub fn reset(&self) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *last = None;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(app: &str, text: &str, options: &[&str]) -> DialogSnapshot {
        DialogSnapshot::new(
            app,
            text,
            options.iter().map(|o| o.to_string()).collect(),
        )
    }

    #[test]
    fn test_same_dialog_twice_accepts_once() {
        let dedup = Deduplicator::new();
        let dialog = snapshot("TextEdit", "Save changes?", &["Save", "Cancel"]);
        assert_eq!(dedup.check(&dialog), DedupVerdict::Fresh);
        assert_eq!(dedup.check(&dialog), DedupVerdict::Repeat);
        assert_eq!(dedup.check(&dialog), DedupVerdict::Repeat);
    }

    #[test]
    fn test_only_the_immediately_preceding_dialog_is_remembered() {
        let dedup = Deduplicator::new();
        let first = snapshot("TextEdit", "Save changes?", &["Save", "Cancel"]);
        let second = snapshot("Finder", "Empty the trash?", &["Empty", "Cancel"]);

        assert_eq!(dedup.check(&first), DedupVerdict::Fresh);
        assert_eq!(dedup.check(&second), DedupVerdict::Fresh);
        // The single slot now holds `second`, so `first` is fresh again.
        assert_eq!(dedup.check(&first), DedupVerdict::Fresh);
    }

    #[test]
    fn test_key_ignores_window_title_and_capture_time() {
        let plain = snapshot("TextEdit", "Save changes?", &["Save"]);
        let titled = snapshot("TextEdit", "Save changes?", &["Save"])
            .with_window_title("Untitled 7");
        assert_eq!(
            DedupKey::for_snapshot(&plain),
            DedupKey::for_snapshot(&titled)
        );
    }

    #[test]
    fn test_key_depends_on_option_order() {
        let forward = snapshot("TextEdit", "Save changes?", &["Save", "Cancel"]);
        let reversed = snapshot("TextEdit", "Save changes?", &["Cancel", "Save"]);
        assert_ne!(
            DedupKey::for_snapshot(&forward),
            DedupKey::for_snapshot(&reversed)
        );
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        // "ab" + "c" must not collide with "a" + "bc".
        let left = snapshot("ab", "c", &["x"]);
        let right = snapshot("a", "bc", &["x"]);
        assert_ne!(
            DedupKey::for_snapshot(&left),
            DedupKey::for_snapshot(&right)
        );
    }

    #[test]
    fn test_reset_forgets_the_slot() {
        let dedup = Deduplicator::new();
        let dialog = snapshot("Mail", "Send without subject?", &["Send", "Cancel"]);
        assert_eq!(dedup.check(&dialog), DedupVerdict::Fresh);
        dedup.reset();
        assert_eq!(dedup.check(&dialog), DedupVerdict::Fresh);
    }
}
