use serde::{Deserialize, Serialize};

/// Playback state reported by the remote generation service.
///
/// The control core keeps a local mirror of this value, updated only from the
/// service's own state-change events, never assumed after issuing a command.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No session, or playback explicitly stopped.
    Stopped,
    /// Session is being established or a play request is in flight.
    Loading,
    /// Connected and generating, but not enough audio buffered to play.
    Buffering,
    /// Audio is streaming.
    Playing,
    /// Playback suspended; the session stays alive.
    Paused,
    /// The service reported a mid-session failure.
    Error,
}

/// Musical scale accepted by the generator, as major/relative-minor pairs.
///
/// The wire value is the screaming-snake name (for example `C_MAJOR_A_MINOR`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scale {
    CMajorAMinor,
    DFlatMajorBFlatMinor,
    DMajorBMinor,
    EFlatMajorCMinor,
    EMajorDFlatMinor,
    FMajorDMinor,
    GFlatMajorEFlatMinor,
    GMajorEMinor,
    AFlatMajorFMinor,
    AMajorGFlatMinor,
    BFlatMajorGMinor,
    BMajorAFlatMinor,
}

impl Scale {
    /// Canonical wire name for this scale.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::CMajorAMinor => "C_MAJOR_A_MINOR",
            Scale::DFlatMajorBFlatMinor => "D_FLAT_MAJOR_B_FLAT_MINOR",
            Scale::DMajorBMinor => "D_MAJOR_B_MINOR",
            Scale::EFlatMajorCMinor => "E_FLAT_MAJOR_C_MINOR",
            Scale::EMajorDFlatMinor => "E_MAJOR_D_FLAT_MINOR",
            Scale::FMajorDMinor => "F_MAJOR_D_MINOR",
            Scale::GFlatMajorEFlatMinor => "G_FLAT_MAJOR_E_FLAT_MINOR",
            Scale::GMajorEMinor => "G_MAJOR_E_MINOR",
            Scale::AFlatMajorFMinor => "A_FLAT_MAJOR_F_MINOR",
            Scale::AMajorGFlatMinor => "A_MAJOR_G_FLAT_MINOR",
            Scale::BFlatMajorGMinor => "B_FLAT_MAJOR_G_MINOR",
            Scale::BMajorAFlatMinor => "B_MAJOR_A_FLAT_MINOR",
        }
    }

    /// Parse a wire name, case-insensitively. Unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Scale> {
        const ALL: [Scale; 12] = [
            Scale::CMajorAMinor,
            Scale::DFlatMajorBFlatMinor,
            Scale::DMajorBMinor,
            Scale::EFlatMajorCMinor,
            Scale::EMajorDFlatMinor,
            Scale::FMajorDMinor,
            Scale::GFlatMajorEFlatMinor,
            Scale::GMajorEMinor,
            Scale::AFlatMajorFMinor,
            Scale::AMajorGFlatMinor,
            Scale::BFlatMajorGMinor,
            Scale::BMajorAFlatMinor,
        ];
        let wanted = value.trim();
        ALL.into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(wanted))
    }
}

/// One weighted text prompt steering generation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightedPrompt {
    /// Prompt text, used verbatim by the generator.
    pub text: String,
    /// Relative weight in `[0, 1]`.
    pub weight: f64,
}

impl WeightedPrompt {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

/// Per-track mix flags forwarded to the generator.
///
/// The flags are independent at this layer; the "only bass and drums" policy
/// (whether it suppresses the other two) lives in the service.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MuteConfig {
    pub mute_bass: bool,
    pub mute_drums: bool,
    pub only_bass_and_drums: bool,
}

/// Partial generation config pushed to the service.
///
/// Every field is optional: an absent field means "keep the service's
/// last-known value". A push therefore carries only the fields that changed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MusicGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<i64>,
}

impl MusicGenerationConfig {
    /// `true` when no field is set (nothing to push).
    pub fn is_empty(&self) -> bool {
        self.scale.is_none()
            && self.brightness.is_none()
            && self.density.is_none()
            && self.seed.is_none()
            && self.temperature.is_none()
            && self.guidance.is_none()
            && self.top_k.is_none()
            && self.bpm.is_none()
    }

    /// Overlay `delta` onto `self`, keeping existing values where the delta
    /// is absent. This is how a service accumulates partial pushes.
    pub fn apply(&mut self, delta: &MusicGenerationConfig) {
        if delta.scale.is_some() {
            self.scale = delta.scale;
        }
        if delta.brightness.is_some() {
            self.brightness = delta.brightness;
        }
        if delta.density.is_some() {
            self.density = delta.density;
        }
        if delta.seed.is_some() {
            self.seed = delta.seed;
        }
        if delta.temperature.is_some() {
            self.temperature = delta.temperature;
        }
        if delta.guidance.is_some() {
            self.guidance = delta.guidance;
        }
        if delta.top_k.is_some() {
            self.top_k = delta.top_k;
        }
        if delta.bpm.is_some() {
            self.bpm = delta.bpm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_parse_is_case_insensitive() {
        assert_eq!(Scale::parse("C_MAJOR_A_MINOR"), Some(Scale::CMajorAMinor));
        assert_eq!(Scale::parse(" g_major_e_minor "), Some(Scale::GMajorEMinor));
        assert_eq!(Scale::parse("H_MAJOR"), None);
        assert_eq!(Scale::parse(""), None);
    }

    #[test]
    fn scale_round_trips_through_wire_name() {
        for name in [
            "C_MAJOR_A_MINOR",
            "E_FLAT_MAJOR_C_MINOR",
            "B_MAJOR_A_FLAT_MINOR",
        ] {
            let scale = Scale::parse(name).expect(name);
            assert_eq!(scale.as_str(), name);
        }
    }

    #[test]
    fn config_is_empty_only_without_fields() {
        let mut cfg = MusicGenerationConfig::default();
        assert!(cfg.is_empty());
        cfg.bpm = Some(120);
        assert!(!cfg.is_empty());
    }

    #[test]
    fn config_apply_overlays_only_present_fields() {
        let mut base = MusicGenerationConfig {
            brightness: Some(0.4),
            bpm: Some(100),
            ..Default::default()
        };
        let delta = MusicGenerationConfig {
            bpm: Some(128),
            seed: Some(7),
            ..Default::default()
        };
        base.apply(&delta);
        assert_eq!(base.brightness, Some(0.4));
        assert_eq!(base.bpm, Some(128));
        assert_eq!(base.seed, Some(7));
    }
}
