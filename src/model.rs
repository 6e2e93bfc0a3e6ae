use serde::{Deserialize, Deserializer, Serialize};

pub(crate) const METER_MIN: i32 = 0;
pub(crate) const METER_MAX: i32 = 100;

/// Narrative phase, derived from the sync rate alone.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum Stage {
    Establishment,
    Disturbance,
    Distortion,
    Possession,
}

impl Stage {
    pub(crate) fn from_sync_rate(sync_rate: i32) -> Self {
        if sync_rate <= 25 {
            Stage::Establishment
        } else if sync_rate <= 50 {
            Stage::Disturbance
        } else if sync_rate <= 85 {
            Stage::Distortion
        } else {
            Stage::Possession
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Stage::Establishment => "establishment",
            Stage::Disturbance => "disturbance",
            Stage::Distortion => "distortion",
            Stage::Possession => "possession",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub(crate) fn toggled(self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

/// Who Nero is talking to. Dialogue generators may ignore it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct PlayerContext {
    pub(crate) nickname: String,
    pub(crate) hobby: String,
}

pub(crate) fn clamp_meter(v: i32) -> i32 {
    v.clamp(METER_MIN, METER_MAX)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GameState {
    sync_rate: i32,
    corruption: i32,
    energy: i32,
    stage: Stage,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            sync_rate: 0,
            corruption: 0,
            energy: 100,
            stage: Stage::Establishment,
        }
    }
}

impl GameState {
    /// Builds a state from raw values, clamping each one and deriving the stage.
    pub(crate) fn new(sync_rate: i32, corruption: i32, energy: i32) -> Self {
        let sync_rate = clamp_meter(sync_rate);
        Self {
            sync_rate,
            corruption: clamp_meter(corruption),
            energy: clamp_meter(energy),
            stage: Stage::from_sync_rate(sync_rate),
        }
    }

    pub(crate) fn sync_rate(&self) -> i32 {
        self.sync_rate
    }

    pub(crate) fn corruption(&self) -> i32 {
        self.corruption
    }

    pub(crate) fn energy(&self) -> i32 {
        self.energy
    }

    pub(crate) fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn with_sync_rate(self, v: i32) -> Self {
        Self::new(v, self.corruption, self.energy)
    }

    pub(crate) fn with_corruption(self, v: i32) -> Self {
        Self::new(self.sync_rate, v, self.energy)
    }

    pub(crate) fn with_energy(self, v: i32) -> Self {
        Self::new(self.sync_rate, self.corruption, v)
    }

    pub(crate) fn to_record(&self) -> SaveRecord {
        SaveRecord {
            sync_rate: self.sync_rate,
            corruption: self.corruption,
            energy: self.energy,
        }
    }
}

/// The persisted shape of [`GameState`]. Stage is left out and recomputed on load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveRecord {
    #[serde(deserialize_with = "de_meter")]
    pub(crate) sync_rate: i32,
    #[serde(deserialize_with = "de_meter")]
    pub(crate) corruption: i32,
    #[serde(deserialize_with = "de_meter")]
    pub(crate) energy: i32,
}

impl From<SaveRecord> for GameState {
    fn from(r: SaveRecord) -> Self {
        GameState::new(r.sync_rate, r.corruption, r.energy)
    }
}

// Older saves may hold fractional or out-of-range numbers.
fn de_meter<'de, D>(d: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = f64::deserialize(d)?;
    if v.is_nan() {
        return Ok(METER_MIN);
    }
    Ok(v.round().clamp(METER_MIN as f64, METER_MAX as f64) as i32)
}

#[derive(Clone, Debug)]
pub(crate) struct RNGState {
    pub(crate) seed: u64,
    pub(crate) event_counter: u64,
}

impl RNGState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            seed,
            event_counter: 0,
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        // Counter-based SplitMix64.
        let mut z = self
            .seed
            .wrapping_add(self.event_counter.wrapping_mul(0x9E3779B97F4A7C15));
        self.event_counter = self.event_counter.wrapping_add(1);

        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    pub(crate) fn next_f32(&mut self) -> f32 {
        // [0,1)
        let v = self.next_u64() >> 40;
        (v as f32) / ((1u64 << 24) as f32)
    }

    pub(crate) fn roll(&mut self, p: f32) -> bool {
        self.next_f32() < p.clamp(0.0, 1.0)
    }

    pub(crate) fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_u64() % n as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stage_thresholds() {
        let cases = [
            (0, Stage::Establishment),
            (25, Stage::Establishment),
            (26, Stage::Disturbance),
            (50, Stage::Disturbance),
            (51, Stage::Distortion),
            (85, Stage::Distortion),
            (86, Stage::Possession),
            (100, Stage::Possession),
        ];
        for (sync, want) in cases {
            assert_eq!(Stage::from_sync_rate(sync), want, "sync={sync}");
        }
    }

    #[test]
    fn stage_ignores_corruption_and_energy() {
        let low = GameState::new(40, 0, 0);
        let high = GameState::new(40, 100, 100);
        assert_eq!(low.stage(), high.stage());
        assert_eq!(low.stage(), Stage::Disturbance);
    }

    #[test]
    fn new_clamps_every_field() {
        let st = GameState::new(150, -20, 900);
        assert_eq!(st.sync_rate(), 100);
        assert_eq!(st.corruption(), 0);
        assert_eq!(st.energy(), 100);
        assert_eq!(st.stage(), Stage::Possession);
    }

    #[test]
    fn record_omits_stage() {
        let json = serde_json::to_value(GameState::new(30, 4, 70).to_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "syncRate": 30, "corruption": 4, "energy": 70 })
        );
    }

    #[test]
    fn record_accepts_fractional_and_out_of_range_numbers() {
        let r: SaveRecord =
            serde_json::from_str(r#"{"syncRate": 60.4, "corruption": 180, "energy": -3}"#)
                .unwrap();
        let st = GameState::from(r);
        assert_eq!(st, GameState::new(60, 100, 0));
        assert_eq!(st.stage(), Stage::Distortion);
    }

    #[test]
    fn rng_is_deterministic_per_seed() {
        let mut a = RNGState::new(7);
        let mut b = RNGState::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert!(!RNGState::new(1).roll(0.0));
        assert!(RNGState::new(1).roll(1.0));
    }
}
