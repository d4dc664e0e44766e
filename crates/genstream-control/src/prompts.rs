//! Weighted-prompt resolution and change detection.

use genstream_types::WeightedPrompt;

use crate::config::StaticControls;

/// Merges an externally supplied prompt list with the static fallback and
/// detects change by structural equality against the previous resolution.
#[derive(Debug, Default)]
pub struct PromptSynchronizer {
    last: Option<Vec<WeightedPrompt>>,
}

impl PromptSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the canonical prompt list for this tick.
    ///
    /// A present, non-empty external list wins verbatim (order preserved, no
    /// re-weighting), filtered to well-formed entries; otherwise the static
    /// fallback yields a single-element list, or an empty list when blank.
    ///
    /// Returns the resolved list when it differs from the previous tick,
    /// `None` otherwise. `last` is `None` only before the first tick, so the
    /// very first resolution always pushes (the service has no prompts yet).
    pub fn resolve(
        &mut self,
        external: Option<&[WeightedPrompt]>,
        statics: &StaticControls,
    ) -> Option<Vec<WeightedPrompt>> {
        let resolved = resolve_prompts(external, statics);
        if self.last.as_deref() == Some(resolved.as_slice()) {
            return None;
        }
        self.last = Some(resolved.clone());
        Some(resolved)
    }
}

fn resolve_prompts(
    external: Option<&[WeightedPrompt]>,
    statics: &StaticControls,
) -> Vec<WeightedPrompt> {
    if let Some(list) = external {
        if !list.is_empty() {
            return list
                .iter()
                .filter(|p| p.weight.is_finite())
                .cloned()
                .collect();
        }
    }
    statics.fallback_prompt().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statics_with(text: &str, weight: f64) -> StaticControls {
        StaticControls {
            prompt_text: text.to_string(),
            prompt_weight: weight,
            ..Default::default()
        }
    }

    #[test]
    fn external_list_overrides_fallback_verbatim() {
        let mut sync = PromptSynchronizer::new();
        let external = vec![WeightedPrompt::new("lofi", 0.8)];
        let resolved = sync
            .resolve(Some(&external), &statics_with("ambient", 1.0))
            .expect("push");
        assert_eq!(resolved, external);
    }

    #[test]
    fn empty_external_list_falls_back() {
        let mut sync = PromptSynchronizer::new();
        let resolved = sync
            .resolve(Some(&[]), &statics_with("ambient", 1.0))
            .expect("push");
        assert_eq!(resolved, vec![WeightedPrompt::new("ambient", 1.0)]);
    }

    #[test]
    fn blank_fallback_resolves_to_empty_list() {
        let mut sync = PromptSynchronizer::new();
        let resolved = sync.resolve(None, &statics_with("   ", 1.0)).expect("push");
        assert!(resolved.is_empty());
        // Staying empty is not a change.
        assert!(sync.resolve(None, &statics_with("", 1.0)).is_none());
    }

    #[test]
    fn malformed_entries_are_filtered() {
        let mut sync = PromptSynchronizer::new();
        let external = vec![
            WeightedPrompt::new("keep", 0.5),
            WeightedPrompt::new("drop", f64::NAN),
        ];
        let resolved = sync
            .resolve(Some(&external), &StaticControls::default())
            .expect("push");
        assert_eq!(resolved, vec![WeightedPrompt::new("keep", 0.5)]);
    }

    #[test]
    fn unchanged_list_does_not_push_again() {
        let mut sync = PromptSynchronizer::new();
        let external = vec![
            WeightedPrompt::new("a", 0.3),
            WeightedPrompt::new("b", 0.7),
        ];
        assert!(sync.resolve(Some(&external), &StaticControls::default()).is_some());
        assert!(sync.resolve(Some(&external), &StaticControls::default()).is_none());

        // Same texts, different order: structurally different, pushes.
        let reordered = vec![
            WeightedPrompt::new("b", 0.7),
            WeightedPrompt::new("a", 0.3),
        ];
        assert!(sync.resolve(Some(&reordered), &StaticControls::default()).is_some());
    }

    #[test]
    fn weight_change_pushes() {
        let mut sync = PromptSynchronizer::new();
        let statics = statics_with("ambient", 0.5);
        assert!(sync.resolve(None, &statics).is_some());
        let statics = statics_with("ambient", 0.9);
        let resolved = sync.resolve(None, &statics).expect("push");
        assert_eq!(resolved[0].weight, 0.9);
    }
}
