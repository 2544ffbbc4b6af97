//! Subject — the set of principals an authentication attempt resolves to.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// An ordered set of principals describing one authenticated identity.
///
/// Ordering is the derived `Principal` order, so iteration is deterministic
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject {
    principals: BTreeSet<Principal>,
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal. Returns `false` if it was already present.
    pub fn insert(&mut self, principal: Principal) -> bool {
        self.principals.insert(principal)
    }

    pub fn contains(&self, principal: &Principal) -> bool {
        self.principals.contains(principal)
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn principals(&self) -> impl Iterator<Item = &Principal> {
        self.principals.iter()
    }

    /// The canonical realm user, if one has been merged in.
    pub fn realm_user(&self) -> Option<&Principal> {
        self.principals.iter().find(|p| p.is_realm_user())
    }

    /// Group principals only.
    pub fn groups(&self) -> impl Iterator<Item = &Principal> {
        self.principals.iter().filter(|p| p.is_group())
    }

    /// Role principals only.
    pub fn roles(&self) -> impl Iterator<Item = &Principal> {
        self.principals.iter().filter(|p| p.is_role())
    }
}

impl FromIterator<Principal> for Subject {
    fn from_iter<I: IntoIterator<Item = Principal>>(iter: I) -> Self {
        Self {
            principals: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Subject {
    type Item = Principal;
    type IntoIter = std::collections::btree_set::IntoIter<Principal>;

    fn into_iter(self) -> Self::IntoIter {
        self.principals.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_deduplicates() {
        let mut subject = Subject::new();
        assert!(subject.insert(Principal::group("ops")));
        assert!(!subject.insert(Principal::group("ops")));
        assert_eq!(subject.len(), 1);
    }

    #[test]
    fn kind_filters_partition_the_set() {
        let subject: Subject = [
            Principal::realm_user("mgmt", "alice"),
            Principal::group("ops"),
            Principal::group("dev"),
            Principal::role("ops"),
        ]
        .into_iter()
        .collect();

        assert_eq!(subject.groups().count(), 2);
        assert_eq!(subject.roles().count(), 1);
        assert_eq!(subject.realm_user().unwrap().name(), "alice");
    }

    #[test]
    fn iteration_is_deterministic() {
        let a: Subject = [Principal::group("b"), Principal::group("a")]
            .into_iter()
            .collect();
        let b: Subject = [Principal::group("a"), Principal::group("b")]
            .into_iter()
            .collect();
        let names_a: Vec<_> = a.principals().map(Principal::name).collect();
        let names_b: Vec<_> = b.principals().map(Principal::name).collect();
        assert_eq!(names_a, names_b);
    }
}
