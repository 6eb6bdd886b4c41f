use std::sync::Arc;

use uuid::Uuid;

use iboard_types::{Idea, VoteDirection};

/// One immutable capture of every idea, in server order (newest first).
///
/// Cloning is cheap; every edit builds a new snapshot, so a snapshot held as
/// a diff baseline can never change underneath its holder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    ideas: Arc<[Idea]>,
}

impl Snapshot {
    /// Build from a server list. Duplicate ids keep their first occurrence.
    pub fn new(ideas: Vec<Idea>) -> Self {
        let mut seen = std::collections::HashSet::with_capacity(ideas.len());
        let ideas: Vec<Idea> = ideas.into_iter().filter(|i| seen.insert(i.id)).collect();
        Self { ideas: ideas.into() }
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Idea> {
        self.ideas.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Copy with one vote applied to `id`; `None` when the idea is absent.
    pub fn with_vote(&self, id: Uuid, direction: VoteDirection) -> Option<Self> {
        self.map_one(id, |idea| idea.apply_vote(direction))
    }

    /// Copy with one previously applied vote taken back.
    pub fn with_vote_reverted(&self, id: Uuid, direction: VoteDirection) -> Option<Self> {
        self.map_one(id, |idea| match direction {
            VoteDirection::Up => idea.upvotes = idea.upvotes.saturating_sub(1),
            VoteDirection::Down => idea.downvotes = idea.downvotes.saturating_sub(1),
        })
    }

    /// Copy with `idea` at the front, replacing any entry with the same id.
    pub fn with_prepended(&self, idea: Idea) -> Self {
        let mut ideas = Vec::with_capacity(self.len() + 1);
        let id = idea.id;
        ideas.push(idea);
        ideas.extend(self.ideas.iter().filter(|i| i.id != id).cloned());
        Self { ideas: ideas.into() }
    }

    pub fn without(&self, id: Uuid) -> Self {
        let ideas: Vec<Idea> = self.ideas.iter().filter(|i| i.id != id).cloned().collect();
        Self { ideas: ideas.into() }
    }

    /// Copy with the entry `id` swapped for `idea` in place. If `idea.id`
    /// already appears elsewhere that other entry is dropped.
    pub fn with_replaced(&self, id: Uuid, idea: Idea) -> Option<Self> {
        let pos = self.ideas.iter().position(|i| i.id == id)?;
        let ideas: Vec<Idea> = self
            .ideas
            .iter()
            .enumerate()
            .filter_map(|(n, i)| {
                if n == pos {
                    Some(idea.clone())
                } else if i.id == idea.id {
                    None
                } else {
                    Some(i.clone())
                }
            })
            .collect();
        Some(Self { ideas: ideas.into() })
    }

    fn map_one(&self, id: Uuid, f: impl FnOnce(&mut Idea)) -> Option<Self> {
        let pos = self.ideas.iter().position(|i| i.id == id)?;
        let mut ideas = self.ideas.to_vec();
        f(&mut ideas[pos]);
        Some(Self { ideas: ideas.into() })
    }
}

impl From<Vec<Idea>> for Snapshot {
    fn from(ideas: Vec<Idea>) -> Self {
        Self::new(ideas)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;

    use super::*;

    pub(crate) fn idea(text: &str, up: u32, down: u32) -> Idea {
        let now = Utc::now();
        Idea {
            id: Uuid::new_v4(),
            text: text.into(),
            upvotes: up,
            downvotes: down,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn duplicate_ids_are_dropped() {
        let a = idea("a", 0, 0);
        let snap = Snapshot::new(vec![a.clone(), idea("b", 0, 0), a.clone()]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.ideas()[0].id, a.id);
    }

    #[test]
    fn edits_leave_the_original_untouched() {
        let a = idea("a", 1, 0);
        let snap = Snapshot::new(vec![a.clone()]);

        let voted = snap.with_vote(a.id, VoteDirection::Up).unwrap();
        assert_eq!(voted.get(a.id).unwrap().upvotes, 2);
        assert_eq!(snap.get(a.id).unwrap().upvotes, 1);

        let reverted = voted.with_vote_reverted(a.id, VoteDirection::Up).unwrap();
        assert_eq!(reverted, snap);
    }

    #[test]
    fn vote_on_missing_idea_is_none() {
        let snap = Snapshot::new(vec![idea("a", 0, 0)]);
        assert!(snap.with_vote(Uuid::new_v4(), VoteDirection::Down).is_none());
    }

    #[test]
    fn prepend_and_replace_keep_ids_unique() {
        let a = idea("a", 0, 0);
        let temp = idea("draft", 0, 0);
        let snap = Snapshot::new(vec![a.clone()]).with_prepended(temp.clone());
        assert_eq!(snap.ideas()[0].id, temp.id);

        let confirmed = idea("draft", 0, 0);
        let swapped = snap.with_replaced(temp.id, confirmed.clone()).unwrap();
        assert_eq!(swapped.len(), 2);
        assert_eq!(swapped.ideas()[0].id, confirmed.id);
        assert!(!swapped.contains(temp.id));

        assert_eq!(swapped.without(a.id).len(), 1);
    }
}
