//! Capability-provider seam: one handler service per contributed
//! authentication back-end.

use std::collections::{BTreeMap, BTreeSet};

use palisade_core::{Principal, Subject};

use crate::attempt::SharedState;
use crate::callback::Callback;
use crate::error::RealmError;
use crate::mechanism::AuthMechanism;

/// Well-known handler configuration option keys.
pub mod option_keys {
    /// The user name a local-trusted-user handler silently authenticates as.
    pub const LOCAL_DEFAULT_USER: &str = "local-default-user";

    /// "true" when the handler can answer a subject request callback with an
    /// explicitly built subject.
    pub const SUBJECT_CALLBACK_SUPPORTED: &str = "subject-callback-supported";
}

/// An independently contributed authentication back-end.
///
/// Exactly one service may claim a given preferred mechanism within a realm;
/// supplementary claims may overlap across services.
pub trait HandlerService: Send + Sync {
    /// The mechanism this service is the authority for.
    fn preferred_mechanism(&self) -> AuthMechanism;

    /// Further mechanisms this service can also satisfy.
    fn supplementary_mechanisms(&self) -> BTreeSet<AuthMechanism> {
        BTreeSet::new()
    }

    /// Declared configuration options (see [`option_keys`]).
    fn configuration_options(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Whether group loading may run after this service authenticates.
    fn allows_group_loading(&self) -> bool {
        true
    }

    /// Whether this service can answer an HTTP challenge right now.
    fn ready_for_http_challenge(&self) -> bool {
        false
    }

    /// Service-specific principal rewriting, applied after the canonical
    /// realm-user wrapping step.
    fn map_principal(&self, principal: Principal) -> Principal {
        principal
    }

    /// Deliver a callback batch for the authentication phase.
    ///
    /// The scratch state is scoped to the current attempt and is the only
    /// channel for passing facts to the authorization phase. Handlers must
    /// reject callback shapes they cannot process with
    /// [`RealmError::UnsupportedCallback`].
    fn handle_callbacks(
        &self,
        callbacks: &mut [Callback],
        state: &mut SharedState,
    ) -> Result<(), RealmError>;
}

/// External provider of group principals for an authenticated subject.
///
/// Absent providers are a no-op; failures inside a provider surface as an
/// unchanged subject.
pub trait SubjectSupplemental: Send + Sync {
    fn supplement(&self, subject: &mut Subject, state: &SharedState);
}
