use crate::storage::{load_json, save_json, SharedStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub(crate) const DIARY_KEY: &str = "nero_diary_entries";
pub(crate) const ENTRY_MAX_CHARS: usize = 300;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct DiaryEntry {
    pub(crate) id: String,
    pub(crate) date: DateTime<Utc>,
    pub(crate) content: String,
}

/// Diary pages, newest first.
pub(crate) struct Diary {
    store: SharedStore,
    entries: Vec<DiaryEntry>,
}

impl Diary {
    pub(crate) fn open(store: SharedStore) -> Self {
        let entries = match load_json::<Vec<DiaryEntry>>(store.as_ref(), DIARY_KEY) {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to load diary");
                Vec::new()
            }
        };
        Self { store, entries }
    }

    pub(crate) fn entries(&self) -> &[DiaryEntry] {
        &self.entries
    }

    /// Adds a page. Blank text is not a page.
    pub(crate) fn write(&mut self, text: &str, now: DateTime<Utc>) -> Option<&DiaryEntry> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut id_ms = now.timestamp_millis();
        while self.entries.iter().any(|e| e.id == id_ms.to_string()) {
            id_ms += 1;
        }
        let entry = DiaryEntry {
            id: id_ms.to_string(),
            date: now,
            content: summarize(text),
        };
        info!(id = %entry.id, "diary entry written");
        self.entries.insert(0, entry);
        self.persist();
        self.entries.first()
    }

    pub(crate) fn delete_latest(&mut self) -> Option<DiaryEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let removed = self.entries.remove(0);
        info!(id = %removed.id, "diary entry deleted");
        self.persist();
        Some(removed)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.store.as_ref(), DIARY_KEY, &self.entries) {
            warn!(error = %e, "failed to save diary");
        }
    }
}

fn summarize(text: &str) -> String {
    if text.chars().count() <= ENTRY_MAX_CHARS {
        return text.to_string();
    }
    let mut s: String = text.chars().take(ENTRY_MAX_CHARS).collect();
    s.push_str("...");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::memory;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn newest_entry_comes_first_and_persists() {
        let kv = memory();
        let mut diary = Diary::open(Rc::clone(&kv));
        diary.write("fed the cat", at(0));
        diary.write("  played with yarn  ", at(60));

        let reopened = Diary::open(kv);
        let contents: Vec<&str> = reopened
            .entries()
            .iter()
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(contents, vec!["played with yarn", "fed the cat"]);
        assert_eq!(reopened.entries()[1].date, at(0));
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut diary = Diary::open(memory());
        assert!(diary.write("   ", at(0)).is_none());
        assert!(diary.entries().is_empty());
    }

    #[test]
    fn long_text_is_truncated() {
        let mut diary = Diary::open(memory());
        let long = "猫".repeat(ENTRY_MAX_CHARS + 5);
        let entry = diary.write(&long, at(0)).unwrap();
        assert_eq!(entry.content.chars().count(), ENTRY_MAX_CHARS + 3);
        assert!(entry.content.ends_with("..."));
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut diary = Diary::open(memory());
        diary.write("a", at(0));
        diary.write("b", at(0));
        assert_ne!(diary.entries()[0].id, diary.entries()[1].id);
    }

    #[test]
    fn delete_on_empty_diary_is_a_no_op() {
        let mut diary = Diary::open(memory());
        assert_eq!(diary.delete_latest(), None);
        diary.write("one", at(0));
        diary.write("two", at(1));
        assert_eq!(diary.delete_latest().map(|e| e.content), Some("two".to_string()));
        assert_eq!(diary.entries().len(), 1);
        diary.clear();
        assert!(diary.entries().is_empty());
    }
}
