//! Orderable predicates over control identities.
//!
//! A [`ControlIdentityComparator`] selects identities for a subscription or
//! for write protection. Comparators are ordered so a subscription table can
//! find an existing entry for an equal comparator.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::identity::ControlIdentity;
use crate::schema::SchemaIndex;

#[derive(Debug, Clone)]
pub enum ControlIdentityComparator {
    /// Exactly one identity.
    Unique(ControlIdentity),
    /// Nothing.
    None,
    /// Every identity published by one schema.
    All(AllControls),
    /// A shared, mutable set of identities.
    Set(IdentitySet),
}

impl ControlIdentityComparator {
    pub fn unique(identity: ControlIdentity) -> Self {
        Self::Unique(identity)
    }

    pub fn set(set: IdentitySet) -> Self {
        Self::Set(set)
    }

    pub fn contains(&self, identity: &ControlIdentity) -> bool {
        match self {
            Self::Unique(id) => id == identity,
            Self::None => false,
            Self::All(all) => all.contains(identity),
            Self::Set(set) => set.contains(identity),
        }
    }

    /// Add every identity currently matched to `items`.
    pub fn fill_set(&self, items: &mut BTreeSet<ControlIdentity>) {
        match self {
            Self::Unique(id) => {
                items.insert(*id);
            }
            Self::None => {}
            Self::All(all) => all.fill_set(items),
            Self::Set(set) => set.fill_set(items),
        }
    }

    pub fn matched(&self) -> BTreeSet<ControlIdentity> {
        let mut items = BTreeSet::new();
        self.fill_set(&mut items);
        items
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Unique(_) => 0,
            Self::None => 1,
            Self::All(_) => 2,
            Self::Set(_) => 3,
        }
    }
}

impl Ord for ControlIdentityComparator {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Unique(a), Self::Unique(b)) => a.cmp(b),
            (Self::None, Self::None) => Ordering::Equal,
            (Self::All(a), Self::All(b)) => a.key().cmp(&b.key()),
            (Self::Set(a), Self::Set(b)) => a.compare(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ControlIdentityComparator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ControlIdentityComparator {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ControlIdentityComparator {}

impl fmt::Display for ControlIdentityComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique(id) => write!(f, "unique {}", id),
            Self::None => f.write_str("none"),
            Self::All(_) => f.write_str("all"),
            Self::Set(set) => write!(f, "set of {}", set.num_items()),
        }
    }
}

impl From<ControlIdentity> for ControlIdentityComparator {
    fn from(identity: ControlIdentity) -> Self {
        Self::Unique(identity)
    }
}

impl From<IdentitySet> for ControlIdentityComparator {
    fn from(set: IdentitySet) -> Self {
        Self::Set(set)
    }
}

/// Matches whatever a schema currently publishes.
///
/// Holds the schema's index rather than the schema, so a schema can keep
/// subscriptions over itself without a reference cycle.
#[derive(Debug, Clone)]
pub struct AllControls {
    index: Arc<RwLock<SchemaIndex>>,
}

impl AllControls {
    pub(crate) fn new(index: Arc<RwLock<SchemaIndex>>) -> Self {
        Self { index }
    }

    pub fn contains(&self, identity: &ControlIdentity) -> bool {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_identity(identity)
    }

    pub fn fill_set(&self, items: &mut BTreeSet<ControlIdentity>) {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        items.extend(index.identities());
    }

    fn key(&self) -> *const RwLock<SchemaIndex> {
        Arc::as_ptr(&self.index)
    }
}

/// A thread-safe identity set. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct IdentitySet {
    items: Arc<Mutex<BTreeSet<ControlIdentity>>>,
}

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<ControlIdentity>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, identity: ControlIdentity) {
        self.lock().insert(identity);
    }

    pub fn add_all<'a>(&self, identities: impl IntoIterator<Item = &'a ControlIdentity>) {
        self.lock().extend(identities.into_iter().copied());
    }

    pub fn remove(&self, identity: &ControlIdentity) {
        self.lock().remove(identity);
    }

    pub fn remove_all<'a>(&self, identities: impl IntoIterator<Item = &'a ControlIdentity>) {
        let mut items = self.lock();
        for id in identities {
            items.remove(id);
        }
    }

    pub fn contains(&self, identity: &ControlIdentity) -> bool {
        self.lock().contains(identity)
    }

    pub fn fill_set(&self, items: &mut BTreeSet<ControlIdentity>) {
        items.extend(self.lock().iter().copied());
    }

    pub fn num_items(&self) -> usize {
        self.lock().len()
    }

    pub fn snapshot(&self) -> BTreeSet<ControlIdentity> {
        self.lock().clone()
    }

    /// Order by size, then by content.
    fn compare(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.items, &other.items) {
            return Ordering::Equal;
        }
        // never hold both locks at once
        let mine = self.snapshot();
        let theirs = other.snapshot();
        mine.len().cmp(&theirs.len()).then_with(|| mine.cmp(&theirs))
    }
}

impl FromIterator<ControlIdentity> for IdentitySet {
    fn from_iter<I: IntoIterator<Item = ControlIdentity>>(iter: I) -> Self {
        Self {
            items: Arc::new(Mutex::new(iter.into_iter().collect())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Section;

    fn id(index: u16) -> ControlIdentity {
        ControlIdentity::descriptor(0x1a, index)
    }

    #[test]
    fn test_unique_and_none() {
        let c = ControlIdentityComparator::unique(id(1));
        assert!(c.contains(&id(1)));
        assert!(!c.contains(&id(2)));
        assert_eq!(c.matched().len(), 1);

        let none = ControlIdentityComparator::None;
        assert!(!none.contains(&id(1)));
        assert!(none.matched().is_empty());
    }

    #[test]
    fn test_set_is_shared_between_clones() {
        let set = IdentitySet::new();
        let comparator = ControlIdentityComparator::set(set.clone());
        assert!(!comparator.contains(&id(3)));
        set.add(id(3));
        assert!(comparator.contains(&id(3)));
        set.add_all(&[id(4), id(5)]);
        assert_eq!(set.num_items(), 3);
        set.remove_all(&[id(3), id(4)]);
        assert_eq!(comparator.matched(), BTreeSet::from([id(5)]));
    }

    #[test]
    fn test_ordering_by_kind_then_content() {
        let a = ControlIdentityComparator::unique(id(1));
        let b = ControlIdentityComparator::unique(id(2));
        let none = ControlIdentityComparator::None;
        let small: ControlIdentityComparator = [id(9)].into_iter().collect::<IdentitySet>().into();
        let large: ControlIdentityComparator = [id(1), id(2)].into_iter().collect::<IdentitySet>().into();

        assert!(a < b);
        assert!(b < none);
        assert!(none < small);
        assert!(small < large);
        assert_eq!(a, ControlIdentityComparator::unique(id(1)));
    }

    #[test]
    fn test_sets_with_equal_content_compare_equal() {
        let x: IdentitySet = [id(1), id(2)].into_iter().collect();
        let y: IdentitySet = [id(2), id(1)].into_iter().collect();
        assert_eq!(
            ControlIdentityComparator::set(x.clone()),
            ControlIdentityComparator::set(y)
        );
        assert_eq!(
            ControlIdentityComparator::set(x.clone()),
            ControlIdentityComparator::set(x)
        );
    }

    #[test]
    fn test_display() {
        let c = ControlIdentityComparator::unique(id(0).with_section(Section::Property, 2));
        assert_eq!(c.to_string(), "unique { 0x001a, 0, property, 2, 0, 0 }");
        assert_eq!(ControlIdentityComparator::None.to_string(), "none");
    }
}
