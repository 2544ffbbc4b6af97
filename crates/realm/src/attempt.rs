//! Per-attempt scratch state and the identity consolidation engine.
//!
//! One [`AuthAttempt`] exists per authentication attempt and is never
//! reused: the callback phase and the authorization phase observe the same
//! [`SharedState`], and consolidation consumes the attempt. Scratch state is
//! passed explicitly, so concurrent attempts (and nested delegate calls on a
//! pooled worker) cannot observe each other by construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use palisade_core::{Principal, RealmName, Subject};

use crate::callback::Callback;
use crate::error::RealmError;
use crate::handler::{HandlerService, SubjectSupplemental};

/// Key under which a handler records the store-canonical user name it loaded
/// during authentication. An explicitly loaded name takes priority over any
/// principal the transport supplies.
pub const LOADED_USERNAME_KEY: &str = "palisade.loaded-username";

/// Key (bool-as-string) a handler sets to suppress group loading for the
/// current attempt.
pub const SKIP_GROUP_LOADING_KEY: &str = "palisade.skip-group-loading";

/// Scratch state scoped to exactly one authentication attempt.
///
/// Lets the authentication phase pass facts to the authorization phase.
/// Created fresh per attempt and dropped with it; there is no cross-attempt
/// visibility.
#[derive(Debug, Clone)]
pub struct SharedState {
    attempt_id: Uuid,
    started_at: DateTime<Utc>,
    values: BTreeMap<String, String>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            attempt_id: Uuid::now_v7(),
            started_at: Utc::now(),
            values: BTreeMap::new(),
        }
    }

    /// Diagnostic identifier of the attempt this state belongs to.
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn loaded_username(&self) -> Option<&str> {
        self.get(LOADED_USERNAME_KEY)
    }

    pub fn set_loaded_username(&mut self, name: impl Into<String>) {
        self.insert(LOADED_USERNAME_KEY, name.into());
    }

    /// Absent or unparseable values mean "do not skip".
    pub fn skip_group_loading(&self) -> bool {
        self.get(SKIP_GROUP_LOADING_KEY)
            .map(|v| v.parse().unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn set_skip_group_loading(&mut self, skip: bool) {
        self.insert(SKIP_GROUP_LOADING_KEY, skip.to_string());
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// The identity consolidation engine for a single authentication attempt.
///
/// Two phases: [`handle`](Self::handle) delivers callback batches to the
/// resolved handler service (possibly several times within one exchange),
/// then [`consolidate`](Self::consolidate) merges every principal source
/// into one subject and consumes the attempt. A failed attempt is simply
/// dropped; nothing needs explicit release.
pub struct AuthAttempt {
    realm_name: RealmName,
    handler: Arc<dyn HandlerService>,
    supplemental: Option<Arc<dyn SubjectSupplemental>>,
    map_groups_to_roles: bool,
    subject_callback_supported: bool,
    state: SharedState,
    subject: Option<Subject>,
}

impl AuthAttempt {
    pub(crate) fn new(
        realm_name: RealmName,
        handler: Arc<dyn HandlerService>,
        supplemental: Option<Arc<dyn SubjectSupplemental>>,
        map_groups_to_roles: bool,
    ) -> Self {
        let subject_callback_supported = handler
            .configuration_options()
            .get(crate::handler::option_keys::SUBJECT_CALLBACK_SUPPORTED)
            .map(|v| v.parse().unwrap_or(false))
            .unwrap_or(false);

        Self {
            realm_name,
            handler,
            supplemental,
            map_groups_to_roles,
            subject_callback_supported,
            state: SharedState::new(),
            subject: None,
        }
    }

    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }

    pub fn shared_state_mut(&mut self) -> &mut SharedState {
        &mut self.state
    }

    /// Deliver a callback batch to the handler service.
    ///
    /// When the handler supports subject passing and the batch is not solely
    /// a single authorization-check callback, one subject request is
    /// appended before delegating and the answered subject is captured. A
    /// follow-up call that only checks authorization therefore never
    /// re-requests the subject.
    pub fn handle(&mut self, callbacks: &mut Vec<Callback>) -> Result<(), RealmError> {
        if !self.subject_callback_supported || is_sole_authorize(callbacks) {
            return self.handler.handle_callbacks(callbacks, &mut self.state);
        }

        callbacks.push(Callback::Subject { subject: None });
        let outcome = self.handler.handle_callbacks(callbacks, &mut self.state);
        let appended = callbacks.pop();
        outcome?;
        if let Some(Callback::Subject { subject: Some(subject) }) = appended {
            self.subject = Some(subject);
        }
        Ok(())
    }

    /// Merge all principal sources into one consolidated identity.
    ///
    /// Canonical realm-user priority: explicitly loaded username, then a
    /// pre-existing realm-user among the supplied principals, then (last
    /// resort) a realm user synthesized from the first other principal.
    /// Exactly one canonical realm user ends up in the subject.
    pub fn consolidate(mut self, raw_principals: Vec<Principal>) -> Result<Subject, RealmError> {
        let mut subject = self.subject.take().unwrap_or_default();

        let mut canonical = self
            .state
            .loaded_username()
            .map(|name| Principal::realm_user(self.realm_name.clone(), name));
        if canonical.is_none() {
            canonical = raw_principals.iter().find(|p| p.is_realm_user()).cloned();
        }

        for principal in raw_principals {
            if principal.is_realm_user() {
                continue;
            }
            if canonical.is_none() {
                canonical = Some(Principal::realm_user(
                    self.realm_name.clone(),
                    principal.name(),
                ));
            }
            subject.insert(principal);
        }

        if let Some(canonical) = canonical {
            subject.insert(canonical);
        }

        if !self.state.skip_group_loading() {
            if let Some(supplemental) = &self.supplemental {
                supplemental.supplement(&mut subject, &self.state);
            }

            if self.map_groups_to_roles {
                let roles: Vec<Principal> = subject
                    .groups()
                    .map(|group| Principal::role(group.name()))
                    .collect();
                for role in roles {
                    subject.insert(role);
                }
            }
        }

        tracing::debug!(
            attempt = %self.state.attempt_id(),
            realm = %self.realm_name,
            principals = subject.len(),
            "consolidated identity"
        );

        Ok(subject)
    }
}

fn is_sole_authorize(callbacks: &[Callback]) -> bool {
    callbacks.len() == 1 && callbacks[0].is_authorize()
}
