//! Companion corruption record and the one-shot pending message.
//!
//! The ledger keeps its own copy of the corruption value under a separate key and
//! classifies it on a four-step scale used by the ending logic. The pending
//! message survives one restart: the next interactive session claims it with
//! [`CorruptionLedger::load_pending`], which deletes it from the store.

use crate::model::clamp_meter;
use crate::storage::SharedStore;
use tracing::{debug, warn};

pub(crate) const CORRUPTION_KEY: &str = "nero_corruption";
pub(crate) const PENDING_MESSAGE_KEY: &str = "nero_pending_message";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum CorruptionStage {
    Normal,
    Suspicious,
    Aggressive,
    Ending,
}

impl CorruptionStage {
    pub(crate) fn from_value(v: i32) -> Self {
        if v <= 30 {
            CorruptionStage::Normal
        } else if v <= 60 {
            CorruptionStage::Suspicious
        } else if v <= 90 {
            CorruptionStage::Aggressive
        } else {
            CorruptionStage::Ending
        }
    }
}

pub(crate) struct CorruptionLedger {
    store: SharedStore,
    value: i32,
    pending: Option<String>,
}

impl CorruptionLedger {
    pub(crate) fn open(store: SharedStore) -> Self {
        let value = match store.get(CORRUPTION_KEY) {
            Ok(Some(raw)) => parse_value(&raw),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "failed to load corruption");
                0
            }
        };
        Self {
            store,
            value,
            pending: None,
        }
    }

    /// Claims the message queued by an earlier session. Headless callers skip
    /// this so the message waits for the next session that can show it.
    pub(crate) fn load_pending(&mut self) {
        match self.store.get(PENDING_MESSAGE_KEY) {
            Ok(Some(msg)) => {
                if let Err(e) = self.store.remove(PENDING_MESSAGE_KEY) {
                    warn!(error = %e, "failed to clear pending message");
                }
                self.pending = Some(msg);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load pending message"),
        }
    }

    #[cfg(test)]
    pub(crate) fn value(&self) -> i32 {
        self.value
    }

    /// Mirrors the value held by the game state.
    pub(crate) fn set(&mut self, v: i32) {
        let v = clamp_meter(v);
        if v == self.value {
            return;
        }
        self.value = v;
        if let Err(e) = self.store.set(CORRUPTION_KEY, &v.to_string()) {
            warn!(error = %e, "failed to save corruption");
        }
    }

    /// Queues a line for the next session as well as this one.
    pub(crate) fn set_pending(&mut self, message: &str) {
        if let Err(e) = self.store.set(PENDING_MESSAGE_KEY, message) {
            warn!(error = %e, "failed to save pending message");
            return;
        }
        debug!("pending message queued");
        self.pending = Some(message.to_string());
    }

    /// Hands out the pending message at most once.
    pub(crate) fn take_pending(&mut self) -> Option<String> {
        let msg = self.pending.take()?;
        // Consumed here, so it must not come back after a restart either.
        if let Err(e) = self.store.remove(PENDING_MESSAGE_KEY) {
            warn!(error = %e, "failed to clear pending message");
        }
        Some(msg)
    }
}

// Mirrors parseInt: leading integer digits, anything unparseable is zero.
fn parse_value(raw: &str) -> i32 {
    let t = raw.trim();
    let end = t
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(t.len());
    t[..end].parse::<i32>().map(clamp_meter).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::{memory, BrokenStore};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    #[test]
    fn stage_thresholds() {
        assert_eq!(CorruptionStage::from_value(30), CorruptionStage::Normal);
        assert_eq!(CorruptionStage::from_value(31), CorruptionStage::Suspicious);
        assert_eq!(CorruptionStage::from_value(60), CorruptionStage::Suspicious);
        assert_eq!(CorruptionStage::from_value(61), CorruptionStage::Aggressive);
        assert_eq!(CorruptionStage::from_value(90), CorruptionStage::Aggressive);
        assert_eq!(CorruptionStage::from_value(91), CorruptionStage::Ending);
    }

    #[test]
    fn value_is_stored_as_integer_string() {
        let kv = memory();
        let mut ledger = CorruptionLedger::open(Rc::clone(&kv));
        ledger.set(12);
        ledger.set(7);
        assert_eq!(kv.get(CORRUPTION_KEY).unwrap().as_deref(), Some("7"));
        assert_eq!(CorruptionLedger::open(kv).value(), 7);
    }

    #[test]
    fn set_clamps_to_meter_range() {
        let kv = memory();
        let mut ledger = CorruptionLedger::open(Rc::clone(&kv));
        ledger.set(250);
        assert_eq!(ledger.value(), 100);
        ledger.set(-4);
        assert_eq!(ledger.value(), 0);
        assert_eq!(kv.get(CORRUPTION_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn lenient_parse_of_stored_value() {
        assert_eq!(parse_value("42"), 42);
        assert_eq!(parse_value(" 17abc"), 17);
        assert_eq!(parse_value("garbage"), 0);
        assert_eq!(parse_value("400"), 100);
        assert_eq!(parse_value("-3"), 0);
    }

    #[test]
    fn pending_message_is_delivered_once_across_restart() {
        let kv = memory();
        let mut ledger = CorruptionLedger::open(Rc::clone(&kv));
        ledger.set_pending("Where did you just go?");

        let mut next = CorruptionLedger::open(Rc::clone(&kv));
        next.load_pending();
        assert_eq!(kv.get(PENDING_MESSAGE_KEY).unwrap(), None);
        assert_eq!(next.take_pending().as_deref(), Some("Where did you just go?"));
        assert_eq!(next.take_pending(), None);

        let mut third = CorruptionLedger::open(kv);
        third.load_pending();
        assert_eq!(third.take_pending(), None);
    }

    #[test]
    fn pending_taken_in_session_is_not_redelivered() {
        let kv = memory();
        let mut ledger = CorruptionLedger::open(Rc::clone(&kv));
        ledger.set_pending("hello");
        assert_eq!(ledger.take_pending().as_deref(), Some("hello"));
        let mut next = CorruptionLedger::open(kv);
        next.load_pending();
        assert_eq!(next.take_pending(), None);
    }

    #[test]
    fn opening_without_claiming_keeps_the_pending_message() {
        let kv = memory();
        CorruptionLedger::open(Rc::clone(&kv)).set_pending("still here");

        let mut headless = CorruptionLedger::open(Rc::clone(&kv));
        headless.set(30);
        assert_eq!(headless.take_pending(), None);
        assert_eq!(kv.get(PENDING_MESSAGE_KEY).unwrap().as_deref(), Some("still here"));

        let mut next = CorruptionLedger::open(kv);
        next.load_pending();
        assert_eq!(next.take_pending().as_deref(), Some("still here"));
    }

    #[test]
    fn broken_backend_keeps_memory_value() {
        let mut ledger = CorruptionLedger::open(Rc::new(BrokenStore));
        ledger.set(44);
        assert_eq!(ledger.value(), 44);
        ledger.set_pending("lost");
        assert_eq!(ledger.take_pending(), None);
    }
}
