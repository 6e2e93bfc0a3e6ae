use crate::model::{GameState, Language, PlayerContext};
use crate::text::lines;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minimum energy for the care actions (feed, water, play).
pub(crate) const INTERACT_ENERGY: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ActionKind {
    WriteDiary,
    Feed,
    Water,
    Play,
    DeleteDiary,
    SwitchTab,
    TryClose,
}

impl ActionKind {
    pub(crate) const ALL: [ActionKind; 7] = [
        ActionKind::WriteDiary,
        ActionKind::Feed,
        ActionKind::Water,
        ActionKind::Play,
        ActionKind::DeleteDiary,
        ActionKind::SwitchTab,
        ActionKind::TryClose,
    ];

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ActionKind::WriteDiary => "write-diary",
            ActionKind::Feed => "feed",
            ActionKind::Water => "water",
            ActionKind::Play => "play",
            ActionKind::DeleteDiary => "delete-diary",
            ActionKind::SwitchTab => "switch-tab",
            ActionKind::TryClose => "try-close",
        }
    }

    pub(crate) fn needs_energy(&self) -> bool {
        matches!(self, ActionKind::Feed | ActionKind::Water | ActionKind::Play)
    }

    pub(crate) fn effect(&self) -> ActionEffect {
        // Balance values; lowered from the first release so progression is slower.
        match self {
            ActionKind::WriteDiary => ActionEffect {
                sync_delta: 2,
                corruption_delta: 1,
                energy_delta: 35,
                dialogue: None,
            },
            ActionKind::Feed | ActionKind::Water => ActionEffect {
                sync_delta: 1,
                corruption_delta: -1,
                energy_delta: -8,
                dialogue: None,
            },
            ActionKind::Play => ActionEffect {
                sync_delta: 1,
                corruption_delta: -1,
                energy_delta: -15,
                dialogue: None,
            },
            ActionKind::DeleteDiary => ActionEffect {
                sync_delta: 4,
                corruption_delta: 8,
                energy_delta: 0,
                dialogue: Some(delete_diary_line),
            },
            ActionKind::SwitchTab => ActionEffect {
                sync_delta: 1,
                corruption_delta: 5,
                energy_delta: 0,
                dialogue: Some(switch_tab_line),
            },
            ActionKind::TryClose => ActionEffect {
                sync_delta: 0,
                corruption_delta: 3,
                energy_delta: 0,
                dialogue: Some(try_close_line),
            },
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown action `{0}` (expected one of: write-diary, feed, water, play, delete-diary, switch-tab, try-close)")]
pub(crate) struct ParseActionError(String);

impl FromStr for ActionKind {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('_', "-");
        ActionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == norm)
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

/// Produces a line from the player context and the post-update corruption.
pub(crate) type DialogueFn = fn(Option<&PlayerContext>, i32, Language) -> Option<String>;

#[derive(Clone, Copy)]
pub(crate) struct ActionEffect {
    pub(crate) sync_delta: i32,
    pub(crate) corruption_delta: i32,
    pub(crate) energy_delta: i32,
    pub(crate) dialogue: Option<DialogueFn>,
}

fn delete_diary_line(_: Option<&PlayerContext>, corruption: i32, lang: Language) -> Option<String> {
    let l = lines(lang);
    let s = if corruption < 50 {
        l.delete_diary_calm
    } else {
        l.delete_diary_cold
    };
    Some(s.to_string())
}

fn switch_tab_line(_: Option<&PlayerContext>, _: i32, lang: Language) -> Option<String> {
    Some(lines(lang).link_interrupted.to_string())
}

fn try_close_line(_: Option<&PlayerContext>, corruption: i32, lang: Language) -> Option<String> {
    let l = lines(lang);
    let s = if corruption >= 60 {
        l.leaving_cold
    } else {
        l.leaving_calm
    };
    Some(s.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) state: GameState,
    pub(crate) dialogue: Option<String>,
}

impl GameState {
    /// One atomic step: apply the deltas of `kind`, then evaluate its dialogue
    /// against the new corruption value.
    pub(crate) fn transition(
        &self,
        kind: ActionKind,
        ctx: Option<&PlayerContext>,
        lang: Language,
    ) -> Transition {
        let effect = kind.effect();
        let state = GameState::new(
            self.sync_rate() + effect.sync_delta,
            self.corruption() + effect.corruption_delta,
            self.energy() + effect.energy_delta,
        );
        let dialogue = effect
            .dialogue
            .and_then(|line| line(ctx, state.corruption(), lang));
        Transition { state, dialogue }
    }

    pub(crate) fn can_interact(&self) -> bool {
        self.energy() >= INTERACT_ENERGY
    }

    pub(crate) fn allows(&self, kind: ActionKind) -> bool {
        !kind.needs_energy() || self.can_interact()
    }
}
