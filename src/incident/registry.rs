//! Active-incident registry
//!
//! ## Responsibilities
//!
//! - Merge new candidates into the active set, one entry per kind
//! - Keep the set sorted ascending by priority (stable)
//! - Render the numbered multi-incident summary

use super::{Incident, IncidentKind};

/// Priority-ordered set of currently active incidents.
///
/// First-seen wins on duplicate kinds; a later candidate of an already
/// active kind is discarded, damage and priority included.
#[derive(Debug, Default, Clone)]
pub struct IncidentRegistry {
    active: Vec<Incident>,
}

impl IncidentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge candidates, then re-sort ascending by priority. The sort is
    /// stable, so insertion order is preserved among equal priorities.
    pub fn merge(&mut self, candidates: Vec<Incident>) {
        for candidate in candidates {
            if self.active.iter().all(|i| i.kind != candidate.kind) {
                self.active.push(candidate);
            }
        }
        self.active.sort_by_key(|i| i.priority);
    }

    /// `"<rank>. <Kind> (P<priority>)"` entries joined by `"; "`
    pub fn summary(&self) -> String {
        self.active
            .iter()
            .enumerate()
            .map(|(i, inc)| format!("{}. {} (P{})", i + 1, inc.kind, inc.priority))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Summary when the set is non-empty, else the literal "Normal Flow"
    pub fn headline(&self) -> String {
        if self.active.is_empty() {
            "Normal Flow".to_string()
        } else {
            self.summary()
        }
    }

    pub fn active(&self) -> &[Incident] {
        &self.active
    }

    pub fn active_kinds(&self) -> Vec<IncidentKind> {
        self.active.iter().map(|i| i.kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Operator reset; clears the whole set
    pub fn reset(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::DamageLevel;

    #[test]
    fn test_merge_dedups_by_kind() {
        let mut registry = IncidentRegistry::new();
        registry.merge(vec![Incident::crash()]);
        registry.merge(vec![Incident::crash()]);
        assert_eq!(registry.active().len(), 1);
    }

    #[test]
    fn test_first_seen_wins() {
        let mut registry = IncidentRegistry::new();
        registry.merge(vec![Incident::jam()]);
        // A later Jam candidate with different damage must be discarded
        registry.merge(vec![Incident {
            kind: IncidentKind::Jam,
            damage: DamageLevel::Extreme,
            priority: 1,
        }]);
        assert_eq!(registry.active().len(), 1);
        assert_eq!(registry.active()[0].damage, DamageLevel::Low);
        assert_eq!(registry.active()[0].priority, 3);
    }

    #[test]
    fn test_sorted_ascending_by_priority() {
        let mut registry = IncidentRegistry::new();
        registry.merge(vec![Incident::jam()]);
        registry.merge(vec![Incident::fire()]);
        registry.merge(vec![Incident::crash()]);

        let priorities: Vec<u8> = registry.active().iter().map(|i| i.priority).collect();
        assert_eq!(priorities, vec![1, 1, 3]);
        // Stable among equal priorities: Fire merged before Crash
        assert_eq!(registry.active()[0].kind, IncidentKind::Fire);
        assert_eq!(registry.active()[1].kind, IncidentKind::Crash);
    }

    #[test]
    fn test_summary_format() {
        let mut registry = IncidentRegistry::new();
        registry.merge(vec![Incident::crash(), Incident::jam()]);
        assert_eq!(registry.summary(), "1. Crash (P1); 2. Jam (P3)");
        assert_eq!(registry.headline(), "1. Crash (P1); 2. Jam (P3)");
    }

    #[test]
    fn test_headline_defaults_to_normal_flow() {
        let registry = IncidentRegistry::new();
        assert_eq!(registry.headline(), "Normal Flow");
    }

    #[test]
    fn test_normal_flow_entry_is_kept_alongside_later_incidents() {
        let mut registry = IncidentRegistry::new();
        registry.merge(vec![Incident::normal_flow()]);
        registry.merge(vec![Incident::fire()]);
        assert_eq!(registry.summary(), "1. Fire (P1); 2. Normal Flow (P4)");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut registry = IncidentRegistry::new();
        registry.merge(vec![Incident::fire(), Incident::jam()]);
        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.headline(), "Normal Flow");
    }
}
