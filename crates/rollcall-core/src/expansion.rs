// ── Row expansion manager ──
//
// Which rows show inline detail. Independent of selection and of the
// filter context: an expanded row that is filtered out reappears expanded.

use std::collections::BTreeSet;

use crate::model::EntityId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionSet {
    ids: BTreeSet<EntityId>,
}

impl ExpansionSet {
    /// Returns `true` if the row is now expanded.
    pub fn toggle(&mut self, id: EntityId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn is_expanded(&self, id: &EntityId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_is_set_membership() {
        let mut e = ExpansionSet::default();
        assert!(e.toggle(EntityId::Int(4)));
        assert!(e.is_expanded(&EntityId::Int(4)));
        assert!(!e.is_expanded(&EntityId::Int(5)));
        assert!(!e.toggle(EntityId::Int(4)));
        assert!(e.is_empty());
    }
}
