use crate::error::TierOutOfRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bounded counter with `LEVELS` states, `0..LEVELS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tier<const LEVELS: u8>(u8);

/// none / EZA / Super EZA
pub type EnhancementTier = Tier<3>;
/// 0 = none, 4 = fully unlocked
pub type PotentialTier = Tier<5>;

impl<const LEVELS: u8> Tier<LEVELS> {
    pub const MAX: u8 = LEVELS - 1;

    pub fn new(value: u8) -> Result<Self, TierOutOfRange> {
        if value > Self::MAX {
            return Err(TierOutOfRange {
                value,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    pub fn max() -> Self {
        Self(Self::MAX)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Wraps back to zero after the top tier.
    pub fn next(self) -> Self {
        Self((self.0 + 1) % LEVELS)
    }
}

impl<const LEVELS: u8> TryFrom<u8> for Tier<LEVELS> {
    type Error = TierOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const LEVELS: u8> From<Tier<LEVELS>> for u8 {
    fn from(tier: Tier<LEVELS>) -> Self {
        tier.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(default)]
    pub owned: bool,
    #[serde(default, rename = "eza")]
    pub enhancement: EnhancementTier,
    #[serde(default, rename = "pot")]
    pub potential: PotentialTier,
}

impl StatusRecord {
    pub fn apply(&mut self, field: StatusField) {
        match field {
            StatusField::Owned(owned) => self.owned = owned,
            StatusField::Enhancement(tier) => self.enhancement = tier,
            StatusField::Potential(tier) => self.potential = tier,
        }
    }
}

/// One field assignment on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    Owned(bool),
    Enhancement(EnhancementTier),
    Potential(PotentialTier),
}

/// Detached copy of the whole store, keyed by item id.
pub type StatusSnapshot = BTreeMap<String, StatusRecord>;

/// Owns every status record. Lookups never fail: unseen ids get a default
/// record on first access.
#[derive(Debug, Clone, Default)]
pub struct StatusStore {
    records: StatusSnapshot,
    dirty: bool,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(records: StatusSnapshot) -> Self {
        Self {
            records,
            dirty: false,
        }
    }

    pub fn get(&mut self, id: &str) -> StatusRecord {
        *self.records.entry(id.to_string()).or_default()
    }

    /// Same as `get` without materializing the record.
    pub fn peek(&self, id: &str) -> StatusRecord {
        self.records.get(id).copied().unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Inserts default records for ids that have none. Returns how many
    /// were added.
    pub fn ensure<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        let mut added = 0;
        for id in ids {
            if !self.records.contains_key(id) {
                self.records.insert(id.to_string(), StatusRecord::default());
                added += 1;
            }
        }
        if added > 0 {
            self.dirty = true;
        }
        added
    }

    pub fn set_field(&mut self, id: &str, field: StatusField) {
        self.records.entry(id.to_string()).or_default().apply(field);
        self.dirty = true;
    }

    /// Applies `field` to every stored id matching `predicate`. Returns the
    /// number of records touched.
    pub fn bulk_set(&mut self, predicate: impl Fn(&str) -> bool, field: StatusField) -> usize {
        let mut touched = 0;
        for (id, record) in self.records.iter_mut() {
            if predicate(id) {
                record.apply(field);
                touched += 1;
            }
        }
        self.dirty = true;
        touched
    }

    pub fn replace_all(&mut self, snapshot: StatusSnapshot) {
        self.records = snapshot;
        self.dirty = true;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.records.clone()
    }

    pub fn records(&self) -> &StatusSnapshot {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_ids_get_default_records() {
        let mut store = StatusStore::new();
        let record = store.get("new-unit");
        assert!(!record.owned);
        assert_eq!(record.enhancement.value(), 0);
        assert_eq!(record.potential.value(), 0);
        assert!(store.contains("new-unit"));
    }

    #[test]
    fn peek_does_not_insert() {
        let store = StatusStore::new();
        assert_eq!(store.peek("ghost"), StatusRecord::default());
        assert!(store.is_empty());
    }

    #[test]
    fn tiers_wrap_and_reject_out_of_range() {
        let mut tier = EnhancementTier::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            tier = tier.next();
            seen.push(tier.value());
        }
        assert_eq!(seen, vec![1, 2, 0, 1]);
        assert_eq!(
            PotentialTier::new(5),
            Err(TierOutOfRange { value: 5, max: 4 })
        );
        assert_eq!(PotentialTier::max().value(), 4);
    }

    #[test]
    fn set_field_creates_and_marks_dirty() {
        let mut store = StatusStore::new();
        assert!(!store.is_dirty());
        store.set_field("a", StatusField::Potential(PotentialTier::max()));
        assert!(store.is_dirty());
        let record = store.peek("a");
        assert_eq!(record.potential.value(), 4);
        assert!(!record.owned);
    }

    #[test]
    fn bulk_set_only_touches_matching_ids() {
        let mut store = StatusStore::new();
        store.ensure(["a", "b", "c"]);
        store.set_field("b", StatusField::Enhancement(EnhancementTier::max()));
        let touched = store.bulk_set(|id| id != "c", StatusField::Owned(true));
        assert_eq!(touched, 2);
        assert!(store.peek("a").owned);
        assert!(store.peek("b").owned);
        assert!(!store.peek("c").owned);
        assert_eq!(store.peek("b").enhancement.value(), 2);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut store = StatusStore::new();
        store.set_field("a", StatusField::Owned(true));
        let snapshot = store.snapshot();
        store.set_field("a", StatusField::Owned(false));
        assert!(snapshot["a"].owned);
        assert!(!store.peek("a").owned);
    }

    #[test]
    fn ensure_only_reports_new_ids() {
        let mut store = StatusStore::new();
        assert_eq!(store.ensure(["a", "b"]), 2);
        store.mark_clean();
        assert_eq!(store.ensure(["a", "b"]), 0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn record_wire_format_uses_short_keys() {
        let record = StatusRecord {
            owned: true,
            enhancement: EnhancementTier::new(1).unwrap(),
            potential: PotentialTier::new(3).unwrap(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"owned":true,"eza":1,"pot":3}"#);

        let partial: StatusRecord = serde_json::from_str(r#"{"owned":true}"#).unwrap();
        assert_eq!(partial.potential.value(), 0);

        assert!(serde_json::from_str::<StatusRecord>(r#"{"eza":3}"#).is_err());
    }
}
