//! Allow-lists used to classify payload identifiers.

use std::collections::HashSet;

/// A read-only set of recognized identifiers.
pub trait Classifier: Send + Sync {
    /// Whether `id` is recognized.
    fn classify(&self, id: &str) -> bool;
}

impl Classifier for HashSet<String> {
    fn classify(&self, id: &str) -> bool {
        self.contains(id)
    }
}

/// Allow-lists consulted while folding full records.
///
/// Identifiers absent from a list are not errors, they are simply not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowLists {
    pub custom_integrations: HashSet<String>,
    pub os_boards: HashSet<String>,
}

impl AllowLists {
    pub fn new(
        custom_integrations: impl IntoIterator<Item = impl Into<String>>,
        os_boards: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            custom_integrations: custom_integrations.into_iter().map(Into::into).collect(),
            os_boards: os_boards.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_custom_integration(&self, domain: &str) -> bool {
        self.custom_integrations.classify(domain)
    }

    pub fn is_os_board(&self, board: &str) -> bool {
        self.os_boards.classify(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let lists = AllowLists::new(["hacs"], ["rpi4-64", "ova"]);
        assert!(lists.is_custom_integration("hacs"));
        assert!(!lists.is_custom_integration("custom_invalid"));
        assert!(lists.is_os_board("ova"));
        assert!(!lists.is_os_board("invalid_board"));
    }

    #[test]
    fn test_empty_lists_recognize_nothing() {
        let lists = AllowLists::default();
        assert!(!lists.is_custom_integration(""));
        assert!(!lists.is_os_board("rpi"));
    }
}
