use crate::corruption::CorruptionStage;
use crate::model::{GameState, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Tint {
    None,
    Mild,
    Heavy,
    Severe,
}

/// How strongly the screen should be disturbed for a given state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Distortion {
    /// Per-frame probability of a glitch burst.
    pub(crate) glitch_chance: f32,
    pub(crate) tint: Tint,
    pub(crate) scanlines: bool,
    pub(crate) vignette: f32,
    pub(crate) red_wash: bool,
    pub(crate) shake: bool,
}

impl Distortion {
    pub(crate) const CALM: Distortion = Distortion {
        glitch_chance: 0.0,
        tint: Tint::None,
        scanlines: false,
        vignette: 0.0,
        red_wash: false,
        shake: false,
    };

    pub(crate) fn for_state(st: &GameState) -> Self {
        let stage = st.stage();
        if stage == Stage::Establishment {
            return Self::CALM;
        }
        let c = st.corruption();
        let possessed = stage == Stage::Possession;
        let tint = if c < 30 {
            Tint::None
        } else if c < 60 {
            Tint::Mild
        } else if c < 90 {
            Tint::Heavy
        } else {
            Tint::Severe
        };
        let vignette = if c >= 50 {
            let cap = if possessed { 1.0 } else { 0.7 };
            ((c - 50) as f32 / 50.0).min(cap)
        } else {
            0.0
        };
        Self {
            glitch_chance: c as f32 / 100.0,
            tint,
            scanlines: c >= 70,
            vignette,
            red_wash: possessed,
            shake: possessed,
        }
    }

    pub(crate) fn is_calm(&self) -> bool {
        *self == Self::CALM
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Ending {
    /// Nero keeps the player.
    Bad,
    /// A fake system error, then a restart.
    Crash,
}

impl Ending {
    pub(crate) fn for_state(st: &GameState) -> Option<Self> {
        if CorruptionStage::from_value(st.corruption()) != CorruptionStage::Ending {
            return None;
        }
        if st.stage() == Stage::Possession {
            Some(Ending::Bad)
        } else {
            Some(Ending::Crash)
        }
    }
}
