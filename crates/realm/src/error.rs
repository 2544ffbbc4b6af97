//! Realm error taxonomy.

use thiserror::Error;

use palisade_core::RealmName;

use crate::mechanism::AuthMechanism;

/// Errors raised by the realm and its per-attempt engine.
///
/// Only `RegistrationConflict` has a wide blast radius (it aborts startup and
/// no realm value is produced). Everything else is local to a single request
/// or attempt and leaves the registry untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RealmError {
    /// Two handler services declared the same preferred mechanism. Startup
    /// is aborted deliberately all-or-nothing: a partially populated
    /// registry could silently authenticate against the wrong mechanism.
    #[error("multiple handler services registered for mechanism '{0}'")]
    RegistrationConflict(AuthMechanism),

    /// No registered service prefers or supports the requested mechanism.
    #[error("no handler service for mechanism '{mechanism}' in realm '{realm}'")]
    MechanismNotFound {
        mechanism: AuthMechanism,
        realm: RealmName,
    },

    /// The deferred credential source has no identity provisioned for the
    /// requested (protocol, host) pair.
    #[error("no server identity for protocol '{protocol}' and host '{host}'")]
    CredentialUnavailable { protocol: String, host: String },

    /// The transport delivered a callback the resolved handler cannot
    /// process. Aborts the current attempt only.
    #[error("unsupported callback: {0}")]
    UnsupportedCallback(String),
}
