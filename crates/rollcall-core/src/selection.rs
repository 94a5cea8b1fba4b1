// ── Selection manager ──
//
// A plain id set that survives page navigation. It may hold ids that are
// not on the visible page, or that vanished server-side; bulk actions
// resolve those against fresh data when they run.

use std::collections::BTreeSet;

use crate::model::EntityId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<EntityId>,
}

impl Selection {
    /// Flip membership of `id`. Returns `true` if it is now selected.
    pub fn toggle_one(&mut self, id: EntityId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Select every visible id, or deselect exactly those when all of them
    /// are already selected. Ids outside `visible` are untouched.
    pub fn toggle_all_on_page(&mut self, visible: &[EntityId]) {
        if self.is_all_selected(visible) {
            for id in visible {
                self.ids.remove(id);
            }
        } else {
            self.ids.extend(visible.iter().cloned());
        }
    }

    /// `visible` is non-empty and every id in it is selected.
    pub fn is_all_selected(&self, visible: &[EntityId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.ids.contains(id))
    }

    /// Some, but not all, of `visible` are selected.
    pub fn is_indeterminate(&self, visible: &[EntityId]) -> bool {
        let selected = visible.iter().filter(|id| self.ids.contains(id)).count();
        selected > 0 && selected < visible.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.ids.contains(id)
    }

    /// Drop ids that no longer need to be selected (e.g. deleted rows).
    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) {
        for id in ids {
            self.ids.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.ids.iter()
    }

    /// Snapshot of the selected ids in ascending order.
    pub fn to_vec(&self) -> Vec<EntityId> {
        self.ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId::Int).collect()
    }

    #[test]
    fn toggle_one_flips_membership() {
        let mut s = Selection::default();
        assert!(s.toggle_one(EntityId::Int(1)));
        assert!(s.contains(&EntityId::Int(1)));
        assert!(!s.toggle_one(EntityId::Int(1)));
        assert!(s.is_empty());
    }

    #[test]
    fn toggle_all_twice_restores_prior_state() {
        let mut s = Selection::default();
        s.toggle_one(EntityId::Int(9));
        let before = s.clone();
        let page = ids(&[1, 2, 3]);

        s.toggle_all_on_page(&page);
        assert!(s.is_all_selected(&page));
        assert!(s.contains(&EntityId::Int(9)));

        s.toggle_all_on_page(&page);
        assert_eq!(s, before);
    }

    #[test]
    fn partial_page_is_completed_first() {
        let mut s = Selection::default();
        s.toggle_one(EntityId::Int(2));
        let page = ids(&[1, 2, 3]);
        s.toggle_all_on_page(&page);
        assert_eq!(s.to_vec(), page);
    }

    #[test]
    fn all_selected_requires_non_empty_page() {
        let s = Selection::default();
        assert!(!s.is_all_selected(&[]));
        assert!(!s.is_indeterminate(&[]));
    }

    #[test]
    fn indeterminate_only_for_partial_pages() {
        let mut s = Selection::default();
        let page = ids(&[1, 2, 3]);
        assert!(!s.is_indeterminate(&page));

        s.toggle_one(EntityId::Int(2));
        assert!(s.is_indeterminate(&page));
        assert!(!s.is_all_selected(&page));

        s.toggle_all_on_page(&page);
        assert!(s.is_all_selected(&page));
        assert!(!s.is_indeterminate(&page));
    }

    #[test]
    fn cross_page_ids_survive_page_toggles() {
        let mut s = Selection::default();
        s.toggle_all_on_page(&ids(&[1, 2]));
        s.toggle_all_on_page(&ids(&[3, 4]));
        assert_eq!(s.len(), 4);
        s.toggle_all_on_page(&ids(&[3, 4]));
        assert_eq!(s.to_vec(), ids(&[1, 2]));
    }
}
