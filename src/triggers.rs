use crate::model::{GameState, Language, Stage};
use crate::text::lines;
use std::time::{Duration, Instant};
use tracing::debug;

/// A second quit within this window leaves even when Nero objects.
pub(crate) const CLOSE_CONFIRM_WINDOW: Duration = Duration::from_secs(5);
pub(crate) const POINTER_COOLDOWN: Duration = Duration::from_secs(10);
pub(crate) const POINTER_WATCH_CORRUPTION: i32 = 50;
pub(crate) const CLOSE_HOLD_CORRUPTION: i32 = 60;

/// Raw things the terminal tells us about the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Signal {
    FocusLost,
    FocusGained,
    QuitRequested,
    PointerRow(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reaction {
    Ignore,
    /// Run switch-tab and queue `pending` for the next session.
    SwitchedAway { pending: &'static str },
    /// Run try-close. With `hold` set, stay and show the warning.
    Leave { hold: Option<&'static str> },
    /// Quit without touching state.
    Exit,
    /// Show a line; state is unchanged.
    Say(&'static str),
}

/// Debounces passive signals so each state-defining event fires at most once.
#[derive(Debug, Default)]
pub(crate) struct PassiveTriggers {
    away: bool,
    pointer_at_top: bool,
    pointer_said_at: Option<Instant>,
    close_held_at: Option<Instant>,
}

impl PassiveTriggers {
    pub(crate) fn on_signal(
        &mut self,
        signal: Signal,
        st: &GameState,
        lang: Language,
        now: Instant,
    ) -> Reaction {
        let dormant = st.stage() == Stage::Establishment;
        let l = lines(lang);
        match signal {
            Signal::FocusGained => {
                self.away = false;
                Reaction::Ignore
            }
            Signal::FocusLost => {
                if dormant || self.away {
                    return Reaction::Ignore;
                }
                self.away = true;
                debug!("focus lost");
                Reaction::SwitchedAway {
                    pending: l.tab_switch,
                }
            }
            Signal::QuitRequested => {
                if dormant {
                    return Reaction::Exit;
                }
                if let Some(at) = self.close_held_at.take() {
                    if now.saturating_duration_since(at) <= CLOSE_CONFIRM_WINDOW {
                        return Reaction::Exit;
                    }
                }
                if st.corruption() >= CLOSE_HOLD_CORRUPTION {
                    self.close_held_at = Some(now);
                    Reaction::Leave {
                        hold: Some(l.before_unload),
                    }
                } else {
                    Reaction::Leave { hold: None }
                }
            }
            Signal::PointerRow(row) => {
                let at_top = row == 0;
                let entered = at_top && !self.pointer_at_top;
                self.pointer_at_top = at_top;
                if !entered || dormant || st.corruption() < POINTER_WATCH_CORRUPTION {
                    return Reaction::Ignore;
                }
                if let Some(at) = self.pointer_said_at {
                    if now.saturating_duration_since(at) < POINTER_COOLDOWN {
                        return Reaction::Ignore;
                    }
                }
                self.pointer_said_at = Some(now);
                Reaction::Say(l.mouse_exit)
            }
        }
    }

    /// Forgets a held close, e.g. when the player goes back to playing.
    pub(crate) fn release_close(&mut self) {
        self.close_held_at = None;
    }
}
