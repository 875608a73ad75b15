//! End-of-day ledger: paired hours and tips sequences with running totals.
//!
//! Totals are maintained incrementally by every mutation and are only
//! recomputed from the entries when a persisted session is loaded.

use crate::errors::LedgerError;
use crate::models::{Direction, Entry, EntryKind, SESSION_SCHEMA_VERSION, ShiftSession};
use tracing::{debug, warn};

const DRIFT_TOLERANCE: f64 = 1e-6;

/// The single most recent deletion, recoverable through [`Ledger::undo`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeletedEntry {
    pub kind: EntryKind,
    pub index: usize,
    pub entry: Entry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakdownItem {
    pub entry: Entry,
    pub tips: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub hourly_rate: f64,
    pub items: Vec<BreakdownItem>,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    hours: Vec<Entry>,
    tips: Vec<Entry>,
    total_hours: f64,
    total_tips: f64,
    last_deleted: Option<DeletedEntry>,
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a form field the way a numeric input reads: blank or garbage is `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn validate(kind: EntryKind, value: f64) -> Result<f64, LedgerError> {
    match kind {
        EntryKind::Hours if value.is_finite() && value > 0.0 => Ok(value),
        EntryKind::Hours => Err(LedgerError::InvalidValue {
            kind,
            rule: "a number greater than 0",
        }),
        EntryKind::Tips if value.is_finite() && value >= 0.0 => Ok(round_cents(value)),
        EntryKind::Tips => Err(LedgerError::InvalidValue {
            kind,
            rule: "a number of 0 or more",
        }),
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from a persisted session, recomputing both totals.
    pub fn from_session(session: &ShiftSession) -> Self {
        let hours = session.hours_entries.clone();
        let tips = session.tips_entries.clone();
        let total_hours: f64 = hours.iter().map(|entry| entry.value).sum();
        let total_tips: f64 = tips.iter().map(|entry| entry.value).sum();

        if (total_hours - session.total_hours).abs() > DRIFT_TOLERANCE
            || (total_tips - session.total_tips).abs() > DRIFT_TOLERANCE
        {
            warn!(
                stored_hours = session.total_hours,
                stored_tips = session.total_tips,
                total_hours,
                total_tips,
                "stored totals disagree with entries, using entry sums"
            );
        }

        Self {
            hours,
            tips,
            total_hours,
            total_tips,
            last_deleted: None,
        }
    }

    /// Snapshot for persistence. The start time is carried over from the
    /// previously stored session when there is one, otherwise stamped `now`.
    pub fn to_session(&self, existing: Option<&ShiftSession>, now_ms: i64) -> ShiftSession {
        let session_start_time = if self.is_empty() {
            None
        } else {
            Some(
                existing
                    .and_then(|session| session.session_start_time)
                    .unwrap_or(now_ms),
            )
        };

        ShiftSession {
            schema_version: SESSION_SCHEMA_VERSION,
            session_start_time,
            total_hours: self.total_hours,
            total_tips: self.total_tips,
            hours_entries: self.hours.clone(),
            tips_entries: self.tips.clone(),
        }
    }

    pub fn entries(&self, kind: EntryKind) -> &[Entry] {
        match kind {
            EntryKind::Hours => &self.hours,
            EntryKind::Tips => &self.tips,
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    pub fn total_tips(&self) -> f64 {
        self.total_tips
    }

    pub fn hourly_rate(&self) -> f64 {
        if self.total_hours > 0.0 {
            self.total_tips / self.total_hours
        } else {
            0.0
        }
    }

    /// Number of display rows: the longer of the two sequences.
    pub fn row_count(&self) -> usize {
        self.hours.len().max(self.tips.len())
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty() && self.tips.is_empty()
    }

    pub fn last_deleted(&self) -> Option<&DeletedEntry> {
        self.last_deleted.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.last_deleted.is_some()
    }

    fn parts_mut(&mut self, kind: EntryKind) -> (&mut Vec<Entry>, &mut f64) {
        match kind {
            EntryKind::Hours => (&mut self.hours, &mut self.total_hours),
            EntryKind::Tips => (&mut self.tips, &mut self.total_tips),
        }
    }

    /// Appends a manually typed value. Returns the new entry's index.
    pub fn add(&mut self, kind: EntryKind, value: f64) -> Result<usize, LedgerError> {
        let value = validate(kind, value)?;
        Ok(self.append(kind, Entry::manual(value)))
    }

    /// Appends a value handed off from one of the calculators.
    pub fn push_auto(&mut self, kind: EntryKind, value: f64) -> Result<usize, LedgerError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(LedgerError::NothingToSend(kind));
        }
        let value = match kind {
            EntryKind::Hours => value,
            EntryKind::Tips => round_cents(value),
        };
        Ok(self.append(kind, Entry::automatic(value)))
    }

    fn append(&mut self, kind: EntryKind, entry: Entry) -> usize {
        let (entries, total) = self.parts_mut(kind);
        entries.push(entry);
        *total += entry.value;
        let index = entries.len() - 1;
        self.last_deleted = None;
        debug!(%kind, index, value = entry.value, auto = entry.auto, "entry added");
        index
    }

    /// Replaces an entry's value and clears its `auto` flag.
    ///
    /// The undo buffer is left untouched.
    pub fn edit(&mut self, kind: EntryKind, index: usize, value: f64) -> Result<(), LedgerError> {
        let value = validate(kind, value)?;
        let (entries, total) = self.parts_mut(kind);
        let entry = entries
            .get_mut(index)
            .ok_or(LedgerError::NoEntry { kind, index })?;
        *total = *total - entry.value + value;
        entry.value = value;
        entry.auto = false;
        debug!(%kind, index, value, "entry edited");
        Ok(())
    }

    pub fn delete(&mut self, kind: EntryKind, index: usize) -> Result<Entry, LedgerError> {
        let (entries, total) = self.parts_mut(kind);
        if index >= entries.len() {
            return Err(LedgerError::NoEntry { kind, index });
        }
        let entry = entries.remove(index);
        *total -= entry.value;
        self.last_deleted = Some(DeletedEntry { kind, index, entry });
        debug!(%kind, index, value = entry.value, "entry deleted");
        Ok(entry)
    }

    /// Restores the most recent deletion at its original position.
    /// Returns `None` when there is nothing to restore.
    pub fn undo(&mut self) -> Option<DeletedEntry> {
        let deleted = self.last_deleted.take()?;
        let (entries, total) = self.parts_mut(deleted.kind);
        let index = deleted.index.min(entries.len());
        entries.insert(index, deleted.entry);
        *total += deleted.entry.value;
        debug!(kind = %deleted.kind, index, "deletion undone");
        Some(deleted)
    }

    /// Swaps row `index` with its neighbour in each sequence independently.
    ///
    /// A sequence that is short at either position has the gap compacted
    /// away after the swap, so hours and tips can drift out of pairing.
    /// Returns `false` when the target row is out of range.
    pub fn reorder(&mut self, index: usize, direction: Direction) -> bool {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        let rows = self.row_count();
        let Some(target) = target.filter(|&target| target < rows && index < rows) else {
            return false;
        };

        swap_compacting(&mut self.hours, index, target);
        swap_compacting(&mut self.tips, index, target);
        debug!(index, target, "rows reordered");
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Per-entry share of the tip pool at the current hourly rate.
    /// `None` until at least one hours entry exists and total hours are positive.
    pub fn breakdown(&self) -> Option<Breakdown> {
        if self.hours.is_empty() || self.total_hours <= 0.0 {
            return None;
        }
        let hourly_rate = self.hourly_rate();
        let items: Vec<BreakdownItem> = self
            .hours
            .iter()
            .map(|&entry| BreakdownItem {
                entry,
                tips: entry.value * hourly_rate,
            })
            .collect();
        let total = items.iter().map(|item| item.tips).sum();

        Some(Breakdown {
            hourly_rate,
            items,
            total,
        })
    }
}

fn swap_compacting(entries: &mut Vec<Entry>, a: usize, b: usize) {
    if entries.get(a).is_none() && entries.get(b).is_none() {
        return;
    }
    let mut slots: Vec<Option<Entry>> = entries.iter().copied().map(Some).collect();
    let needed = a.max(b) + 1;
    if slots.len() < needed {
        slots.resize(needed, None);
    }
    slots.swap(a, b);
    *entries = slots.into_iter().flatten().collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(left: f64, right: f64) {
        assert!((left - right).abs() < 1e-9, "{left} != {right}");
    }

    fn assert_totals_match(ledger: &Ledger) {
        let hours: f64 = ledger.entries(EntryKind::Hours).iter().map(|e| e.value).sum();
        let tips: f64 = ledger.entries(EntryKind::Tips).iter().map(|e| e.value).sum();
        assert_close(ledger.total_hours(), hours);
        assert_close(ledger.total_tips(), tips);
    }

    fn values(ledger: &Ledger, kind: EntryKind) -> Vec<f64> {
        ledger.entries(kind).iter().map(|e| e.value).collect()
    }

    #[test]
    fn add_rejects_invalid_values_without_mutating() {
        let mut ledger = Ledger::new();
        assert!(ledger.add(EntryKind::Hours, 0.0).is_err());
        assert!(ledger.add(EntryKind::Hours, f64::NAN).is_err());
        assert!(ledger.add(EntryKind::Tips, -1.0).is_err());
        assert!(ledger.is_empty());

        assert_eq!(ledger.add(EntryKind::Tips, 0.0), Ok(0));
        assert_eq!(ledger.add(EntryKind::Hours, 4.5), Ok(0));
        assert_totals_match(&ledger);
    }

    #[test]
    fn tips_are_rounded_to_cents() {
        let mut ledger = Ledger::new();
        ledger.add(EntryKind::Tips, 12.345_6).unwrap();
        assert_close(ledger.entries(EntryKind::Tips)[0].value, 12.35);
        assert_close(ledger.total_tips(), 12.35);
    }

    #[test]
    fn totals_track_entries_across_adds_and_deletes() {
        let mut ledger = Ledger::new();
        for value in [3.0, 4.25, 0.5, 8.0] {
            ledger.add(EntryKind::Hours, value).unwrap();
            assert_totals_match(&ledger);
        }
        for value in [10.1, 20.2, 30.3] {
            ledger.add(EntryKind::Tips, value).unwrap();
            assert_totals_match(&ledger);
        }
        ledger.delete(EntryKind::Hours, 1).unwrap();
        assert_totals_match(&ledger);
        ledger.delete(EntryKind::Tips, 0).unwrap();
        assert_totals_match(&ledger);
        ledger.edit(EntryKind::Tips, 1, 5.0).unwrap();
        assert_totals_match(&ledger);
    }

    #[test]
    fn undo_restores_entry_at_original_index() {
        let mut ledger = Ledger::new();
        for value in [1.0, 2.0, 3.0] {
            ledger.add(EntryKind::Hours, value).unwrap();
        }
        let before = ledger.total_hours();

        let removed = ledger.delete(EntryKind::Hours, 1).unwrap();
        assert_eq!(removed, Entry::manual(2.0));
        assert!(ledger.can_undo());

        let restored = ledger.undo().expect("undo available");
        assert_eq!(restored.index, 1);
        assert_eq!(values(&ledger, EntryKind::Hours), vec![1.0, 2.0, 3.0]);
        assert_close(ledger.total_hours(), before);

        assert!(ledger.undo().is_none());
        assert_eq!(values(&ledger, EntryKind::Hours), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn only_latest_deletion_is_recoverable() {
        let mut ledger = Ledger::new();
        ledger.add(EntryKind::Tips, 10.0).unwrap();
        ledger.add(EntryKind::Tips, 20.0).unwrap();
        ledger.delete(EntryKind::Tips, 0).unwrap();
        ledger.delete(EntryKind::Tips, 0).unwrap();

        ledger.undo().unwrap();
        assert_eq!(values(&ledger, EntryKind::Tips), vec![20.0]);
        assert!(ledger.undo().is_none());
    }

    #[test]
    fn add_clears_undo_buffer_but_edit_does_not() {
        let mut ledger = Ledger::new();
        ledger.add(EntryKind::Hours, 2.0).unwrap();
        ledger.add(EntryKind::Hours, 3.0).unwrap();

        ledger.delete(EntryKind::Hours, 0).unwrap();
        ledger.edit(EntryKind::Hours, 0, 6.0).unwrap();
        assert!(ledger.can_undo());

        ledger.add(EntryKind::Hours, 1.0).unwrap();
        assert!(!ledger.can_undo());
    }

    #[test]
    fn edit_replaces_value_and_clears_auto_flag() {
        let mut ledger = Ledger::new();
        ledger.push_auto(EntryKind::Tips, 99.999).unwrap();
        assert_eq!(ledger.entries(EntryKind::Tips)[0], Entry::automatic(100.0));

        ledger.edit(EntryKind::Tips, 0, 75.5).unwrap();
        assert_eq!(ledger.entries(EntryKind::Tips)[0], Entry::manual(75.5));
        assert_close(ledger.total_tips(), 75.5);

        assert!(ledger.edit(EntryKind::Tips, 0, -3.0).is_err());
        assert!(matches!(
            ledger.edit(EntryKind::Tips, 4, 1.0),
            Err(LedgerError::NoEntry { index: 4, .. })
        ));
        assert_close(ledger.total_tips(), 75.5);
    }

    #[test]
    fn push_auto_requires_positive_value() {
        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.push_auto(EntryKind::Hours, 0.0),
            Err(LedgerError::NothingToSend(EntryKind::Hours))
        );
        assert_eq!(ledger.push_auto(EntryKind::Hours, 7.5), Ok(0));
    }

    #[test]
    fn reorder_swaps_paired_rows() {
        let mut ledger = Ledger::new();
        ledger.add(EntryKind::Hours, 1.0).unwrap();
        ledger.add(EntryKind::Hours, 2.0).unwrap();
        ledger.add(EntryKind::Tips, 10.0).unwrap();
        ledger.add(EntryKind::Tips, 20.0).unwrap();

        assert!(ledger.reorder(1, Direction::Up));
        assert_eq!(values(&ledger, EntryKind::Hours), vec![2.0, 1.0]);
        assert_eq!(values(&ledger, EntryKind::Tips), vec![20.0, 10.0]);

        assert!(!ledger.reorder(0, Direction::Up));
        assert!(!ledger.reorder(1, Direction::Down));
    }

    #[test]
    fn reorder_compacts_holes_in_shorter_sequence() {
        let mut ledger = Ledger::new();
        for value in [1.0, 2.0, 3.0] {
            ledger.add(EntryKind::Hours, value).unwrap();
        }
        ledger.add(EntryKind::Tips, 10.0).unwrap();

        // Row 0 moves down: tips has nothing at row 1, so its entry lands in
        // row 1 and the hole at row 0 is compacted out again.
        assert!(ledger.reorder(0, Direction::Down));
        assert_eq!(values(&ledger, EntryKind::Hours), vec![2.0, 1.0, 3.0]);
        assert_eq!(values(&ledger, EntryKind::Tips), vec![10.0]);

        // Neither position exists in tips: it is left alone.
        assert!(ledger.reorder(2, Direction::Up));
        assert_eq!(values(&ledger, EntryKind::Hours), vec![2.0, 3.0, 1.0]);
        assert_eq!(values(&ledger, EntryKind::Tips), vec![10.0]);
        assert_totals_match(&ledger);
    }

    #[test]
    fn hourly_rate_and_breakdown() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.hourly_rate(), 0.0);
        assert!(ledger.breakdown().is_none());

        ledger.add(EntryKind::Hours, 4.0).unwrap();
        ledger.add(EntryKind::Hours, 6.0).unwrap();
        ledger.add(EntryKind::Tips, 250.0).unwrap();

        assert_close(ledger.hourly_rate(), 25.0);
        let breakdown = ledger.breakdown().expect("breakdown");
        assert_close(breakdown.items[0].tips, 100.0);
        assert_close(breakdown.items[1].tips, 150.0);
        assert_close(breakdown.total, 250.0);
    }

    #[test]
    fn session_round_trip_preserves_start_time() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.to_session(None, 5_000).session_start_time, None);

        ledger.add(EntryKind::Hours, 2.0).unwrap();
        let first = ledger.to_session(None, 5_000);
        assert_eq!(first.session_start_time, Some(5_000));

        ledger.add(EntryKind::Tips, 40.0).unwrap();
        let second = ledger.to_session(Some(&first), 9_000);
        assert_eq!(second.session_start_time, Some(5_000));

        let reloaded = Ledger::from_session(&second);
        assert_eq!(values(&reloaded, EntryKind::Tips), vec![40.0]);
        assert!(!reloaded.can_undo());
    }

    #[test]
    fn load_recomputes_drifted_totals() {
        let session = ShiftSession {
            total_hours: 99.0,
            total_tips: 1.0,
            hours_entries: vec![Entry::manual(3.0), Entry::automatic(4.0)],
            tips_entries: vec![Entry::manual(55.5)],
            ..ShiftSession::default()
        };
        let ledger = Ledger::from_session(&session);
        assert_close(ledger.total_hours(), 7.0);
        assert_close(ledger.total_tips(), 55.5);
    }

    #[test]
    fn parse_amount_accepts_only_finite_numbers() {
        assert_eq!(parse_amount(" 12.5 "), Some(12.5));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
    }
}
