//! Tagged principal model.
//!
//! Every identity fact derived during authentication is one of a closed set
//! of principal kinds. Classification is done by matching on the variant,
//! never by runtime type inspection.

use serde::{Deserialize, Serialize};

use crate::realm::RealmName;

/// An identified subject of some kind (user, group, role).
///
/// # Invariants
/// - `RealmUser` is the canonical authenticated identity within a realm; a
///   consolidated subject carries at most one of them.
/// - `Group` and `Role` principals are flat names; role projection produces a
///   `Role` with the same name as its source `Group`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// The canonical authenticated user within a realm partition.
    RealmUser { realm: RealmName, name: String },
    /// A principal contributed by the transport or an external store that is
    /// not the canonical realm user (e.g. a certificate DN).
    External { name: String },
    /// A group membership.
    Group { name: String },
    /// A role, usually projected from a group of the same name.
    Role { name: String },
}

impl Principal {
    pub fn realm_user(realm: impl Into<RealmName>, name: impl Into<String>) -> Self {
        Self::RealmUser {
            realm: realm.into(),
            name: name.into(),
        }
    }

    pub fn external(name: impl Into<String>) -> Self {
        Self::External { name: name.into() }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::Group { name: name.into() }
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::Role { name: name.into() }
    }

    /// The plain name of the principal, without realm qualification.
    pub fn name(&self) -> &str {
        match self {
            Principal::RealmUser { name, .. }
            | Principal::External { name }
            | Principal::Group { name }
            | Principal::Role { name } => name,
        }
    }

    pub fn is_realm_user(&self) -> bool {
        matches!(self, Principal::RealmUser { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Principal::Group { .. })
    }

    pub fn is_role(&self) -> bool {
        matches!(self, Principal::Role { .. })
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Principal::RealmUser { realm, name } => write!(f, "{}@{}", name, realm),
            Principal::External { name } => f.write_str(name),
            Principal::Group { name } => write!(f, "group:{}", name),
            Principal::Role { name } => write!(f, "role:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_user_display_is_realm_qualified() {
        let p = Principal::realm_user("ManagementRealm", "alice");
        assert_eq!(p.to_string(), "alice@ManagementRealm");
        assert!(p.is_realm_user());
        assert_eq!(p.name(), "alice");
    }

    #[test]
    fn kind_predicates_match_variants() {
        assert!(Principal::group("ops").is_group());
        assert!(Principal::role("ops").is_role());
        assert!(!Principal::external("cn=alice").is_realm_user());
    }

    #[test]
    fn serde_round_trip_is_tagged_by_kind() {
        let p = Principal::group("admins");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["kind"], "group");
        assert_eq!(json["name"], "admins");
        let back: Principal = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
