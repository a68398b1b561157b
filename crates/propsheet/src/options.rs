//! Sheet configuration

use crate::dependency::DependencySet;

/// Options for a [`Sheet`](crate::Sheet)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetOptions {
    /// Maximum number of cells the sheet accepts (default and ceiling:
    /// [`DependencySet::CAPACITY`])
    pub max_cells: usize,
    /// Copy the value of a linked interface output back into its input after
    /// evaluation (default: true)
    pub propagate_linked: bool,
}

impl SheetOptions {
    /// Effective cell bound, clamped to the dependency set capacity
    pub fn capacity(&self) -> usize {
        self.max_cells.min(DependencySet::CAPACITY)
    }
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            max_cells: DependencySet::CAPACITY,
            propagate_linked: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_clamped() {
        let options = SheetOptions {
            max_cells: 5000,
            ..Default::default()
        };
        assert_eq!(options.capacity(), DependencySet::CAPACITY);

        let options = SheetOptions {
            max_cells: 3,
            ..Default::default()
        };
        assert_eq!(options.capacity(), 3);
    }
}
