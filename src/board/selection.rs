use std::collections::HashSet;

use crate::board::listeners::{ListenerId, Listeners};
use crate::model::task::TaskId;

/// Modifier state accompanying a selection click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectModifier {
    /// Plain click: select only this item
    #[default]
    None,
    /// Shift-click: extend from the anchor
    Range,
    /// Ctrl/Cmd-click: flip this item alone
    DiscreteToggle,
}

/// Emitted after every change of membership or anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    /// Selected ids, ascending
    pub members: Vec<TaskId>,
    pub anchor: Option<TaskId>,
}

/// Multi-selection over a displayed, ordered sequence of task ids.
///
/// Range operations take the currently displayed order as an argument, so
/// the same selection can back a list, a board or a timeline.
#[derive(Debug, Default)]
pub struct Selection {
    members: HashSet<TaskId>,
    anchor: Option<TaskId>,
    listeners: Listeners<SelectionChange>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change(&mut self, listener: impl FnMut(&SelectionChange) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Apply a click on `id` with the given modifier.
    ///
    /// A click on an id absent from `order` is ignored. A range click with
    /// no anchor, or with an anchor that is no longer displayed, behaves as
    /// a plain click.
    pub fn toggle_with_modifiers(&mut self, id: TaskId, modifier: SelectModifier, order: &[TaskId]) {
        let Some(target_pos) = order.iter().position(|&x| x == id) else {
            tracing::debug!(task = id, "selection click on undisplayed task ignored");
            return;
        };

        match modifier {
            SelectModifier::None => self.select_only(id),
            SelectModifier::Range => {
                let anchor_pos = self
                    .anchor
                    .and_then(|a| order.iter().position(|&x| x == a));
                match anchor_pos {
                    Some(anchor_pos) => {
                        let (start, end) = if anchor_pos <= target_pos {
                            (anchor_pos, target_pos)
                        } else {
                            (target_pos, anchor_pos)
                        };
                        let mut members = self.members.clone();
                        members.extend(order[start..=end].iter().copied());
                        self.commit(members, self.anchor);
                    }
                    None => self.select_only(id),
                }
            }
            SelectModifier::DiscreteToggle => self.toggle_one(id),
        }
    }

    /// Flip membership of one id; an added id becomes the anchor
    pub fn toggle_one(&mut self, id: TaskId) {
        let mut members = self.members.clone();
        let anchor = if members.remove(&id) {
            self.anchor
        } else {
            members.insert(id);
            Some(id)
        };
        self.commit(members, anchor);
    }

    pub fn select_many(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        let mut members = self.members.clone();
        members.extend(ids);
        self.commit(members, self.anchor);
    }

    pub fn deselect_many(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        let mut members = self.members.clone();
        for id in ids {
            members.remove(&id);
        }
        self.commit(members, self.anchor);
    }

    /// Select every displayed id
    pub fn select_all(&mut self, order: &[TaskId]) {
        self.select_many(order.iter().copied());
    }

    pub fn clear(&mut self) {
        self.commit(HashSet::new(), None);
    }

    /// Drop ids that are no longer in the collection. Returns the pruned ids.
    pub fn prune(&mut self, present: &HashSet<TaskId>) -> Vec<TaskId> {
        let mut pruned: Vec<TaskId> = self
            .members
            .iter()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        if pruned.is_empty() && self.anchor.is_none_or(|a| present.contains(&a)) {
            return pruned;
        }
        pruned.sort_unstable();
        let members = self
            .members
            .iter()
            .filter(|id| present.contains(id))
            .copied()
            .collect();
        let anchor = self.anchor.filter(|a| present.contains(a));
        self.commit(members, anchor);
        pruned
    }

    pub fn is_selected(&self, id: TaskId) -> bool {
        self.members.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn anchor(&self) -> Option<TaskId> {
        self.anchor
    }

    /// Selected ids, ascending
    pub fn members(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.members.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Selected ids in display order; selected ids not displayed are omitted
    pub fn selected_in_order(&self, order: &[TaskId]) -> Vec<TaskId> {
        order
            .iter()
            .filter(|id| self.members.contains(id))
            .copied()
            .collect()
    }

    fn select_only(&mut self, id: TaskId) {
        self.commit(HashSet::from([id]), Some(id));
    }

    fn commit(&mut self, members: HashSet<TaskId>, anchor: Option<TaskId>) {
        if members == self.members && anchor == self.anchor {
            return;
        }
        self.members = members;
        self.anchor = anchor;
        let change = SelectionChange {
            members: self.members(),
            anchor: self.anchor,
        };
        tracing::trace!(count = change.members.len(), anchor = ?change.anchor, "selection changed");
        self.listeners.emit(&change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const ORDER: [TaskId; 4] = [10, 20, 30, 40];

    #[test]
    fn plain_click_replaces_selection() {
        let mut sel = Selection::new();
        sel.select_many([10, 20]);
        sel.toggle_with_modifiers(30, SelectModifier::None, &ORDER);
        assert_eq!(sel.members(), vec![30]);
        assert_eq!(sel.anchor(), Some(30));
    }

    #[test]
    fn range_extends_from_anchor_both_directions() {
        let mut sel = Selection::new();
        sel.toggle_with_modifiers(10, SelectModifier::None, &ORDER);
        sel.toggle_with_modifiers(40, SelectModifier::Range, &ORDER);
        assert_eq!(sel.members(), vec![10, 20, 30, 40]);
        assert_eq!(sel.anchor(), Some(10));

        let mut rev = Selection::new();
        rev.toggle_with_modifiers(40, SelectModifier::None, &ORDER);
        rev.toggle_with_modifiers(10, SelectModifier::Range, &ORDER);
        assert_eq!(rev.members(), sel.members());
    }

    #[test]
    fn range_unions_with_existing_selection() {
        let mut sel = Selection::new();
        sel.toggle_with_modifiers(40, SelectModifier::None, &ORDER);
        sel.toggle_with_modifiers(10, SelectModifier::DiscreteToggle, &ORDER);
        // anchor is now 10
        sel.toggle_with_modifiers(20, SelectModifier::Range, &ORDER);
        assert_eq!(sel.members(), vec![10, 20, 40]);
    }

    #[test]
    fn range_uses_display_order_not_ids() {
        let order = [3, 1, 2];
        let mut sel = Selection::new();
        sel.toggle_with_modifiers(3, SelectModifier::None, &order);
        sel.toggle_with_modifiers(1, SelectModifier::Range, &order);
        assert_eq!(sel.members(), vec![1, 3]);
    }

    #[test]
    fn range_without_anchor_is_plain_click() {
        let mut sel = Selection::new();
        sel.toggle_with_modifiers(30, SelectModifier::Range, &ORDER);
        assert_eq!(sel.members(), vec![30]);
        assert_eq!(sel.anchor(), Some(30));
    }

    #[test]
    fn range_with_undisplayed_anchor_is_plain_click() {
        let mut sel = Selection::new();
        sel.toggle_with_modifiers(99, SelectModifier::None, &[99, 10]);
        sel.toggle_with_modifiers(20, SelectModifier::Range, &ORDER);
        assert_eq!(sel.members(), vec![20]);
        assert_eq!(sel.anchor(), Some(20));
    }

    #[test]
    fn discrete_toggle_moves_anchor_only_when_adding() {
        let mut sel = Selection::new();
        sel.toggle_with_modifiers(10, SelectModifier::None, &ORDER);
        sel.toggle_with_modifiers(30, SelectModifier::DiscreteToggle, &ORDER);
        assert_eq!(sel.anchor(), Some(30));
        sel.toggle_with_modifiers(10, SelectModifier::DiscreteToggle, &ORDER);
        assert_eq!(sel.members(), vec![30]);
        assert_eq!(sel.anchor(), Some(30));
    }

    #[test]
    fn click_on_undisplayed_id_is_noop() {
        let mut sel = Selection::new();
        sel.toggle_with_modifiers(10, SelectModifier::None, &ORDER);
        sel.toggle_with_modifiers(77, SelectModifier::None, &ORDER);
        assert_eq!(sel.members(), vec![10]);
    }

    #[test]
    fn toggle_one_twice_restores_membership() {
        let mut sel = Selection::new();
        sel.select_many([10]);
        sel.toggle_one(20);
        sel.toggle_one(20);
        assert!(!sel.is_selected(20));
        assert_eq!(sel.members(), vec![10]);
        sel.toggle_one(10);
        sel.toggle_one(10);
        assert!(sel.is_selected(10));
    }

    #[test]
    fn bulk_ops_are_idempotent_and_keep_anchor() {
        let mut sel = Selection::new();
        sel.toggle_one(10);
        sel.select_many([20, 30]);
        sel.select_many([20, 30]);
        assert_eq!(sel.count(), 3);
        sel.deselect_many([30, 99]);
        sel.deselect_many([30]);
        assert_eq!(sel.members(), vec![10, 20]);
        assert_eq!(sel.anchor(), Some(10));
    }

    #[test]
    fn clear_drops_anchor() {
        let mut sel = Selection::new();
        sel.toggle_one(10);
        sel.clear();
        assert!(sel.is_empty());
        assert_eq!(sel.anchor(), None);
    }

    #[test]
    fn prune_removes_missing_ids_and_anchor() {
        let mut sel = Selection::new();
        sel.select_many([10, 20]);
        sel.toggle_one(30);
        let present = HashSet::from([10, 40]);
        assert_eq!(sel.prune(&present), vec![20, 30]);
        assert_eq!(sel.members(), vec![10]);
        assert_eq!(sel.anchor(), None);
    }

    #[test]
    fn selected_in_order_follows_display() {
        let mut sel = Selection::new();
        sel.select_many([40, 10, 99]);
        assert_eq!(sel.selected_in_order(&ORDER), vec![10, 40]);
    }

    #[test]
    fn listeners_fire_only_on_change() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut sel = Selection::new();
        let s = Rc::clone(&seen);
        sel.on_change(move |c| s.borrow_mut().push(c.members.clone()));
        sel.select_many([10]);
        sel.select_many([10]);
        sel.clear();
        sel.clear();
        assert_eq!(*seen.borrow(), vec![vec![10], vec![]]);
    }
}
