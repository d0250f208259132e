//! C10: in-memory fold state for nested workflow steps in an aggregated
//! agent view.
//!
//! Each workflow parent (keyed by its raw_suffix timestamp) owns one of
//! three fold levels. Never persisted — a fresh `gai work` invocation, or a
//! fresh TUI session, always starts every key at [`FoldLevel::Collapsed`].

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldLevel {
    Collapsed,
    Expanded,
    FullyExpanded,
}

#[derive(Debug, Default)]
pub struct FoldStateManager {
    states: HashMap<String, FoldLevel>,
}

impl FoldStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> FoldLevel {
        self.states.get(key).copied().unwrap_or(FoldLevel::Collapsed)
    }

    /// Advance one step: Collapsed -> Expanded -> FullyExpanded. Returns
    /// whether the level changed.
    pub fn expand(&mut self, key: &str) -> bool {
        match self.get(key) {
            FoldLevel::Collapsed => {
                self.states.insert(key.to_string(), FoldLevel::Expanded);
                true
            }
            FoldLevel::Expanded => {
                self.states.insert(key.to_string(), FoldLevel::FullyExpanded);
                true
            }
            FoldLevel::FullyExpanded => false,
        }
    }

    /// Retreat one step: FullyExpanded -> Expanded -> Collapsed.
    pub fn collapse(&mut self, key: &str) -> bool {
        match self.get(key) {
            FoldLevel::FullyExpanded => {
                self.states.insert(key.to_string(), FoldLevel::Expanded);
                true
            }
            FoldLevel::Expanded => {
                self.states.insert(key.to_string(), FoldLevel::Collapsed);
                true
            }
            FoldLevel::Collapsed => false,
        }
    }

    pub fn expand_all(&mut self, keys: &[String]) -> bool {
        keys.iter().fold(false, |changed, key| self.expand(key) || changed)
    }

    /// If any key is FullyExpanded, only those retreat (to Expanded);
    /// otherwise every key retreats one step.
    pub fn collapse_all(&mut self, keys: &[String]) -> bool {
        if self.has_any_fully_expanded(keys) {
            let mut changed = false;
            for key in keys {
                if self.get(key) == FoldLevel::FullyExpanded {
                    self.states.insert(key.clone(), FoldLevel::Expanded);
                    changed = true;
                }
            }
            return changed;
        }

        keys.iter().fold(false, |changed, key| self.collapse(key) || changed)
    }

    pub fn has_any_fully_expanded(&self, keys: &[String]) -> bool {
        keys.iter().any(|key| self.get(key) == FoldLevel::FullyExpanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_collapsed() {
        let mgr = FoldStateManager::new();
        assert_eq!(mgr.get("w1"), FoldLevel::Collapsed);
    }

    #[test]
    fn expand_advances_one_step_at_a_time() {
        let mut mgr = FoldStateManager::new();
        assert!(mgr.expand("w1"));
        assert_eq!(mgr.get("w1"), FoldLevel::Expanded);
        assert!(mgr.expand("w1"));
        assert_eq!(mgr.get("w1"), FoldLevel::FullyExpanded);
        assert!(!mgr.expand("w1"));
    }

    #[test]
    fn collapse_retreats_one_step_at_a_time() {
        let mut mgr = FoldStateManager::new();
        mgr.expand("w1");
        mgr.expand("w1");
        assert!(mgr.collapse("w1"));
        assert_eq!(mgr.get("w1"), FoldLevel::Expanded);
        assert!(mgr.collapse("w1"));
        assert_eq!(mgr.get("w1"), FoldLevel::Collapsed);
        assert!(!mgr.collapse("w1"));
    }

    #[test]
    fn collapse_all_only_retreats_fully_expanded_when_any_present() {
        let mut mgr = FoldStateManager::new();
        mgr.expand("w1");
        mgr.expand("w1"); // FullyExpanded
        mgr.expand("w2"); // Expanded

        let keys = vec!["w1".to_string(), "w2".to_string()];
        assert!(mgr.collapse_all(&keys));
        assert_eq!(mgr.get("w1"), FoldLevel::Expanded);
        assert_eq!(mgr.get("w2"), FoldLevel::Expanded, "w2 untouched this pass");
    }

    #[test]
    fn collapse_all_retreats_everything_when_none_fully_expanded() {
        let mut mgr = FoldStateManager::new();
        mgr.expand("w1");
        mgr.expand("w2");

        let keys = vec!["w1".to_string(), "w2".to_string()];
        assert!(mgr.collapse_all(&keys));
        assert_eq!(mgr.get("w1"), FoldLevel::Collapsed);
        assert_eq!(mgr.get("w2"), FoldLevel::Collapsed);
    }

    #[test]
    fn expand_all_advances_every_key() {
        let mut mgr = FoldStateManager::new();
        let keys = vec!["w1".to_string(), "w2".to_string()];
        assert!(mgr.expand_all(&keys));
        assert_eq!(mgr.get("w1"), FoldLevel::Expanded);
        assert_eq!(mgr.get("w2"), FoldLevel::Expanded);
    }
}
