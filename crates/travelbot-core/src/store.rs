use crate::state::{Turn, TurnId};

/// Ordered log of conversation turns.
///
/// Turns are only ever appended, except that the most recent match of a
/// predicate may be replaced in place or removed. Ids keep increasing across
/// [`ConversationStore::clear`].
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
    last_id: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, mut turn: Turn) -> TurnId {
        self.last_id += 1;
        turn.id = TurnId(self.last_id);
        self.turns.push(turn);
        TurnId(self.last_id)
    }

    /// Replace the most recent turn matching `predicate`. The replacement
    /// takes over the old turn's slot and id.
    pub fn replace_last<P>(&mut self, predicate: P, mut turn: Turn) -> Option<TurnId>
    where
        P: Fn(&Turn) -> bool,
    {
        let slot = self.turns.iter_mut().rev().find(|t| predicate(t))?;
        turn.id = slot.id;
        *slot = turn;
        Some(slot.id)
    }

    pub fn remove_last<P>(&mut self, predicate: P) -> Option<Turn>
    where
        P: Fn(&Turn) -> bool,
    {
        let idx = self.turns.iter().rposition(|t| predicate(t))?;
        Some(self.turns.remove(idx))
    }

    /// Value copy of the conversation in order.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format;
    use crate::state::{ChatRole, TurnKind};

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut store = ConversationStore::new();
        let a = store.append(Turn::user("one"));
        let b = store.append(Turn::user("two"));
        assert!(b > a);
        assert_eq!(store.len(), 2);
        assert_eq!(store.last().map(|t| t.id), Some(b));
    }

    #[test]
    fn test_replace_last_keeps_position_and_id() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("Best beaches?"));
        let pending = store.append(Turn::placeholder());

        let replaced = store.replace_last(
            |t| t.is_placeholder(),
            Turn::assistant("Mirissa", format("Mirissa")),
        );

        assert_eq!(replaced, Some(pending));
        let turns = store.snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].id, pending);
        assert_eq!(turns[1].kind, TurnKind::Message);
        assert_eq!(turns[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_replace_last_picks_most_recent_match() {
        let mut store = ConversationStore::new();
        let first = store.append(Turn::placeholder());
        let second = store.append(Turn::placeholder());

        store.replace_last(|t| t.is_placeholder(), Turn::notice("gone"));

        assert!(store.get(first).is_some_and(|t| t.is_placeholder()));
        assert!(store.get(second).is_some_and(|t| t.kind == TurnKind::Notice));
    }

    #[test]
    fn test_replace_without_match_is_noop() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("hi"));
        let before = store.snapshot();
        assert_eq!(store.replace_last(|t| t.is_placeholder(), Turn::notice("x")), None);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_remove_last() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("hi"));
        let pending = store.append(Turn::placeholder());
        let removed = store.remove_last(|t| t.id == pending);
        assert_eq!(removed.map(|t| t.id), Some(pending));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("hi"));
        let snapshot = store.snapshot();
        store.append(Turn::user("again"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_clear_does_not_reuse_ids() {
        let mut store = ConversationStore::new();
        let before = store.append(Turn::user("hi"));
        store.clear();
        assert!(store.is_empty());
        let after = store.append(Turn::user("hi"));
        assert!(after > before);
    }
}
