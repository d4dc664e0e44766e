//! Generation-parameter resolution and change detection.
//!
//! Each tick, every parameter resolves from `{CV override, static value}`
//! with CV winning unconditionally when present. The resolver diffs the
//! resolved snapshot against the previous tick's and pushes only the fields
//! whose effective value actually changed, so flapping raw sources that
//! resolve to the same value never cause network traffic.

use genstream_types::{MusicGenerationConfig, Scale};

use crate::config::StaticControls;

/// Per-tick CV override values. `None` means the input is unpatched.
#[derive(Clone, Debug, Default)]
pub struct CvFrame {
    /// Scale wire name; validated during resolution.
    pub scale: Option<String>,
    pub brightness: Option<f64>,
    pub density: Option<f64>,
    pub seed: Option<f64>,
    pub temperature: Option<f64>,
    pub guidance: Option<f64>,
    pub top_k: Option<f64>,
    pub bpm: Option<f64>,
}

/// Resolves effective generation parameters and detects change.
///
/// State is exactly the last resolved snapshot used for diffing.
#[derive(Debug, Default)]
pub struct ParameterResolver {
    last: MusicGenerationConfig,
}

impl ParameterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the effective config for this tick.
    ///
    /// Returns a delta holding only the fields whose resolved value differs
    /// from the previous tick, or `None` when nothing changed. A field that
    /// resolves to "absent" is never pushed; the service keeps its
    /// last-known value.
    pub fn resolve(
        &mut self,
        cv: &CvFrame,
        statics: &StaticControls,
    ) -> Option<MusicGenerationConfig> {
        let resolved = effective_config(cv, statics);
        let delta = changed_fields(&self.last, &resolved);
        self.last = resolved;
        if delta.is_empty() { None } else { Some(delta) }
    }

    /// The snapshot resolved on the most recent tick.
    pub fn last_resolved(&self) -> &MusicGenerationConfig {
        &self.last
    }
}

/// Resolve every parameter to its effective value for one tick.
fn effective_config(cv: &CvFrame, statics: &StaticControls) -> MusicGenerationConfig {
    MusicGenerationConfig {
        scale: resolve_scale(cv.scale.as_deref(), statics.scale.as_deref()),
        brightness: resolve_float(cv.brightness, statics.brightness),
        density: resolve_float(cv.density, statics.density),
        seed: resolve_seed(cv.seed, statics.seed),
        temperature: resolve_float(cv.temperature, statics.temperature),
        guidance: resolve_float(cv.guidance, statics.guidance),
        top_k: resolve_int(cv.top_k, statics.top_k),
        bpm: resolve_int(cv.bpm, statics.bpm),
    }
}

/// CV wins when present; the winning value must parse into a known scale or
/// the parameter is dropped entirely (no fallback to the losing source).
fn resolve_scale(cv: Option<&str>, statics: Option<&str>) -> Option<Scale> {
    let winner = cv.or(statics)?;
    let parsed = Scale::parse(winner);
    if parsed.is_none() {
        tracing::debug!(value = winner, "invalid scale dropped");
    }
    parsed
}

fn resolve_float(cv: Option<f64>, statics: Option<f64>) -> Option<f64> {
    cv.or(statics).filter(|v| v.is_finite())
}

fn resolve_int(cv: Option<f64>, statics: Option<f64>) -> Option<i64> {
    cv.or(statics).filter(|v| v.is_finite()).map(|v| v.trunc() as i64)
}

/// Seed resolution. A **static** seed of exactly 0 means "automatic seed"
/// and resolves to absent. The sentinel does not apply to a CV override:
/// CV 0 is forwarded literally as seed 0.
fn resolve_seed(cv: Option<f64>, statics: Option<f64>) -> Option<i64> {
    if let Some(v) = cv {
        return if v.is_finite() { Some(v.trunc() as i64) } else { None };
    }
    let v = statics.filter(|v| v.is_finite())?;
    let seed = v.trunc() as i64;
    if seed == 0 { None } else { Some(seed) }
}

/// Fields of `next` that are present and differ from `prev`.
fn changed_fields(
    prev: &MusicGenerationConfig,
    next: &MusicGenerationConfig,
) -> MusicGenerationConfig {
    fn diff<T: Copy + PartialEq>(prev: Option<T>, next: Option<T>) -> Option<T> {
        match next {
            Some(v) if prev != next => Some(v),
            _ => None,
        }
    }
    MusicGenerationConfig {
        scale: diff(prev.scale, next.scale),
        brightness: diff(prev.brightness, next.brightness),
        density: diff(prev.density, next.density),
        seed: diff(prev.seed, next.seed),
        temperature: diff(prev.temperature, next.temperature),
        guidance: diff(prev.guidance, next.guidance),
        top_k: diff(prev.top_k, next.top_k),
        bpm: diff(prev.bpm, next.bpm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statics() -> StaticControls {
        StaticControls {
            brightness: Some(0.5),
            density: Some(0.6),
            temperature: Some(1.1),
            bpm: Some(120.0),
            ..Default::default()
        }
    }

    #[test]
    fn first_tick_pushes_static_values() {
        let mut resolver = ParameterResolver::new();
        let delta = resolver.resolve(&CvFrame::default(), &statics()).expect("delta");
        assert_eq!(delta.brightness, Some(0.5));
        assert_eq!(delta.density, Some(0.6));
        assert_eq!(delta.temperature, Some(1.1));
        assert_eq!(delta.bpm, Some(120));
        assert!(delta.scale.is_none());
        assert!(delta.seed.is_none());
    }

    #[test]
    fn unchanged_resolution_pushes_nothing() {
        let mut resolver = ParameterResolver::new();
        assert!(resolver.resolve(&CvFrame::default(), &statics()).is_some());
        assert!(resolver.resolve(&CvFrame::default(), &statics()).is_none());
        assert!(resolver.resolve(&CvFrame::default(), &statics()).is_none());
    }

    #[test]
    fn equal_resolution_from_different_sources_pushes_nothing() {
        // Static brightness 0.5 first, then a CV override of the same value:
        // the effective value never changes, so no second push.
        let mut resolver = ParameterResolver::new();
        assert!(resolver.resolve(&CvFrame::default(), &statics()).is_some());
        let cv = CvFrame {
            brightness: Some(0.5),
            ..Default::default()
        };
        assert!(resolver.resolve(&cv, &statics()).is_none());
    }

    #[test]
    fn cv_overrides_static() {
        let mut resolver = ParameterResolver::new();
        resolver.resolve(&CvFrame::default(), &statics());
        let cv = CvFrame {
            bpm: Some(90.9),
            ..Default::default()
        };
        let delta = resolver.resolve(&cv, &statics()).expect("delta");
        assert_eq!(delta.bpm, Some(90));
        // Only the changed field is in the delta.
        assert!(delta.brightness.is_none());
    }

    #[test]
    fn static_seed_zero_means_auto() {
        let mut resolver = ParameterResolver::new();
        let s = StaticControls {
            seed: Some(0.0),
            ..Default::default()
        };
        assert!(resolver.resolve(&CvFrame::default(), &s).is_none());
        assert!(resolver.last_resolved().seed.is_none());
    }

    #[test]
    fn cv_seed_zero_is_literal() {
        let mut resolver = ParameterResolver::new();
        let s = StaticControls {
            seed: Some(42.0),
            ..Default::default()
        };
        let delta = resolver.resolve(&CvFrame::default(), &s).expect("delta");
        assert_eq!(delta.seed, Some(42));
        let cv = CvFrame {
            seed: Some(0.0),
            ..Default::default()
        };
        let delta = resolver.resolve(&cv, &s).expect("delta");
        assert_eq!(delta.seed, Some(0));
    }

    #[test]
    fn invalid_scale_is_dropped_not_forwarded() {
        let mut resolver = ParameterResolver::new();
        let s = StaticControls {
            scale: Some("NOT_A_SCALE".to_string()),
            ..Default::default()
        };
        assert!(resolver.resolve(&CvFrame::default(), &s).is_none());

        let cv = CvFrame {
            scale: Some("C_MAJOR_A_MINOR".to_string()),
            ..Default::default()
        };
        let delta = resolver.resolve(&cv, &s).expect("delta");
        assert_eq!(delta.scale, Some(Scale::CMajorAMinor));
    }

    #[test]
    fn invalid_cv_scale_does_not_fall_back_to_static() {
        let mut resolver = ParameterResolver::new();
        let s = StaticControls {
            scale: Some("G_MAJOR_E_MINOR".to_string()),
            ..Default::default()
        };
        let cv = CvFrame {
            scale: Some("bogus".to_string()),
            ..Default::default()
        };
        assert!(resolver.resolve(&cv, &s).is_none());
    }

    #[test]
    fn non_finite_values_are_omitted() {
        let mut resolver = ParameterResolver::new();
        let cv = CvFrame {
            brightness: Some(f64::NAN),
            top_k: Some(f64::INFINITY),
            seed: Some(f64::NEG_INFINITY),
            ..Default::default()
        };
        assert!(resolver.resolve(&cv, &StaticControls::default()).is_none());
    }

    #[test]
    fn integers_truncate_toward_zero() {
        let mut resolver = ParameterResolver::new();
        let cv = CvFrame {
            top_k: Some(39.99),
            bpm: Some(-0.5),
            seed: Some(7.9),
            ..Default::default()
        };
        let delta = resolver
            .resolve(&cv, &StaticControls::default())
            .expect("delta");
        assert_eq!(delta.top_k, Some(39));
        assert_eq!(delta.seed, Some(7));
        // -0.5 truncates to 0; it resolved from CV so it is not the auto
        // sentinel, but it also equals the initial "absent" comparison only
        // if it was previously unset.
        assert_eq!(delta.bpm, Some(0));
    }

    #[test]
    fn removing_a_source_does_not_push() {
        let mut resolver = ParameterResolver::new();
        let cv = CvFrame {
            guidance: Some(4.0),
            ..Default::default()
        };
        assert!(resolver.resolve(&cv, &StaticControls::default()).is_some());
        // CV unpatched, no static fallback: parameter resolves to absent,
        // which is "keep last-known", not a push.
        assert!(resolver
            .resolve(&CvFrame::default(), &StaticControls::default())
            .is_none());
    }
}
