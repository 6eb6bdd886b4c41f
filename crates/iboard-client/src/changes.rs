use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::snapshot::Snapshot;

/// How long emitted records stay visible.
pub const CHANGE_DISPLAY_WINDOW: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    New,
    VoteUp,
    VoteDown,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::VoteUp => "vote_up",
            Self::VoteDown => "vote_down",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub id: Uuid,
    pub kind: ChangeKind,
    pub previous_score: Option<i64>,
    pub new_score: Option<i64>,
}

/// Diff two snapshots. Ideas present only in `previous` yield nothing.
pub fn detect_changes(previous: &Snapshot, current: &Snapshot) -> Vec<ChangeRecord> {
    let before: HashMap<Uuid, i64> = previous
        .ideas()
        .iter()
        .map(|i| (i.id, i.score()))
        .collect();

    current
        .ideas()
        .iter()
        .filter_map(|idea| {
            let now = idea.score();
            match before.get(&idea.id) {
                None => Some(ChangeRecord {
                    id: idea.id,
                    kind: ChangeKind::New,
                    previous_score: None,
                    new_score: None,
                }),
                Some(&prev) if now != prev => Some(ChangeRecord {
                    id: idea.id,
                    kind: if now > prev {
                        ChangeKind::VoteUp
                    } else {
                        ChangeKind::VoteDown
                    },
                    previous_score: Some(prev),
                    new_score: Some(now),
                }),
                Some(_) => None,
            }
        })
        .collect()
}

/// Holds the previous snapshot and the records of the latest non-empty diff.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    previous: Snapshot,
    active: Vec<ChangeRecord>,
    emitted_at: Option<Instant>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from `baseline` without emitting anything for it.
    pub fn with_baseline(baseline: Snapshot) -> Self {
        Self {
            previous: baseline,
            ..Self::default()
        }
    }

    /// Diff `current` against the held snapshot, then make it the new
    /// baseline. Returns the records from this diff.
    pub fn observe(&mut self, current: Snapshot, now: Instant) -> Vec<ChangeRecord> {
        let records = detect_changes(&self.previous, &current);
        self.previous = current;

        if !records.is_empty() {
            self.active = records.clone();
            self.emitted_at = Some(now);
        }
        records
    }

    /// Replace the baseline without diffing.
    pub fn rebase(&mut self, snapshot: Snapshot) {
        self.previous = snapshot;
    }

    /// Drop the active record for `id`, e.g. after a local edit is undone.
    pub fn retract(&mut self, id: Uuid) {
        self.active.retain(|r| r.id != id);
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.previous
    }

    pub fn active(&self, now: Instant) -> &[ChangeRecord] {
        if self.is_live(now) { &self.active } else { &[] }
    }

    pub fn change_for(&self, id: Uuid, now: Instant) -> Option<&ChangeRecord> {
        self.active(now).iter().find(|r| r.id == id)
    }

    pub fn clear_expired(&mut self, now: Instant) {
        if !self.is_live(now) {
            self.active.clear();
            self.emitted_at = None;
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.emitted_at
            .is_some_and(|at| now.saturating_duration_since(at) < CHANGE_DISPLAY_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use iboard_types::VoteDirection;

    use super::*;
    use crate::snapshot::tests::idea;

    #[test]
    fn identical_snapshots_yield_nothing() {
        let snap = Snapshot::new(vec![idea("a", 3, 1), idea("b", 0, 0)]);
        assert!(detect_changes(&snap, &snap).is_empty());
    }

    #[test]
    fn one_new_idea_yields_one_new_record() {
        let a = idea("a", 0, 0);
        let b = idea("b", 0, 0);
        let before = Snapshot::new(vec![a.clone()]);
        let after = Snapshot::new(vec![b.clone(), a]);

        let records = detect_changes(&before, &after);
        assert_eq!(
            records,
            vec![ChangeRecord {
                id: b.id,
                kind: ChangeKind::New,
                previous_score: None,
                new_score: None,
            }]
        );
    }

    #[test]
    fn score_changes_carry_both_scores() {
        let a = idea("a", 2, 0);
        let b = idea("b", 1, 1);
        let before = Snapshot::new(vec![a.clone(), b.clone()]);
        let after = before
            .with_vote(a.id, VoteDirection::Up)
            .unwrap()
            .with_vote(b.id, VoteDirection::Down)
            .unwrap();

        let records = detect_changes(&before, &after);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ChangeKind::VoteUp);
        assert_eq!(records[0].previous_score, Some(2));
        assert_eq!(records[0].new_score, Some(3));
        assert_eq!(records[1].kind, ChangeKind::VoteDown);
        assert_eq!(records[1].previous_score, Some(0));
        assert_eq!(records[1].new_score, Some(-1));
    }

    #[test]
    fn balanced_votes_are_not_a_change() {
        let a = idea("a", 1, 1);
        let mut moved = a.clone();
        moved.upvotes = 5;
        moved.downvotes = 5;
        let records = detect_changes(&Snapshot::new(vec![a]), &Snapshot::new(vec![moved]));
        assert!(records.is_empty());
    }

    #[test]
    fn deletions_are_ignored() {
        let before = Snapshot::new(vec![idea("a", 0, 0), idea("b", 0, 0)]);
        let after = before.without(before.ideas()[0].id);
        assert!(detect_changes(&before, &after).is_empty());
    }

    #[test]
    fn records_expire_after_the_display_window() {
        let a = idea("a", 0, 0);
        let start = Instant::now();
        let mut detector = ChangeDetector::with_baseline(Snapshot::default());

        let emitted = detector.observe(Snapshot::new(vec![a.clone()]), start);
        assert_eq!(emitted.len(), 1);

        let almost = start + CHANGE_DISPLAY_WINDOW - Duration::from_millis(1);
        assert!(detector.change_for(a.id, almost).is_some());

        let expired = start + CHANGE_DISPLAY_WINDOW;
        assert!(detector.change_for(a.id, expired).is_none());
        assert!(detector.active(expired).is_empty());

        detector.clear_expired(expired);
        assert!(detector.active(start).is_empty());
    }

    #[test]
    fn empty_diff_keeps_active_records() {
        let a = idea("a", 0, 0);
        let start = Instant::now();
        let mut detector = ChangeDetector::new();

        let snap = Snapshot::new(vec![a.clone()]);
        detector.observe(snap.clone(), start);
        let later = start + Duration::from_millis(500);
        assert!(detector.observe(snap.clone(), later).is_empty());
        assert_eq!(detector.active(later).len(), 1);
        assert_eq!(detector.snapshot(), &snap);
    }

    #[test]
    fn retract_removes_only_that_record() {
        let a = idea("a", 0, 0);
        let b = idea("b", 0, 0);
        let now = Instant::now();
        let mut detector = ChangeDetector::new();
        detector.observe(Snapshot::new(vec![a.clone(), b.clone()]), now);

        detector.retract(a.id);
        assert!(detector.change_for(a.id, now).is_none());
        assert!(detector.change_for(b.id, now).is_some());
    }

    #[test]
    fn rebase_does_not_emit() {
        let a = idea("a", 0, 0);
        let mut detector = ChangeDetector::new();
        detector.rebase(Snapshot::new(vec![a.clone()]));

        let now = Instant::now();
        assert!(detector.observe(Snapshot::new(vec![a]), now).is_empty());
        assert!(detector.active(now).is_empty());
    }
}
