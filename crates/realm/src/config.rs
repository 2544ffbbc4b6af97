//! Per-mechanism configuration bundles.
//!
//! Built once at startup for every registered mechanism. The principal
//! rewriter is an explicit ordered list of named steps so the merge order is
//! auditable and testable in isolation. Kerberos is the one mechanism whose
//! server credential cannot be static: it is produced lazily per request
//! from the runtime (protocol, host) pair.

use std::sync::Arc;

use palisade_core::{Principal, RealmName};

use crate::error::RealmError;
use crate::handler::HandlerService;
use crate::mechanism::{AuthMechanism, Transport};

/// Keys of the flat mechanism options bundle assembled at startup.
pub mod bundle_keys {
    /// Default user for the local-trusted-user mechanism, copied from the
    /// owning handler's declared options.
    pub const LOCAL_DEFAULT_USER: &str = "local-user.default-user";

    /// Directory the local-trusted-user mechanism writes challenge tokens
    /// to. Injected from the host environment; consumed as a string only.
    pub const LOCAL_CHALLENGE_PATH: &str = "local-user.challenge-path";

    /// Comma-separated protocol aliases under which the same mechanisms
    /// apply on the wire.
    pub const ALTERNATIVE_PROTOCOLS: &str = "alternative-protocols";
}

/// Value injected under [`bundle_keys::ALTERNATIVE_PROTOCOLS`].
pub const ALTERNATIVE_PROTOCOL: &str = "management";

/// An opaque server credential handed to the mechanism implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCredential {
    /// The provisioned service principal, e.g. `HTTP/host@REALM`.
    pub service_principal: String,
}

/// Source of per-(protocol, host) server credentials.
///
/// Fails with [`RealmError::CredentialUnavailable`] when no identity is
/// provisioned for the pair.
pub trait CredentialSource: Send + Sync {
    fn credential_for(&self, protocol: &str, host: &str) -> Result<ServiceCredential, RealmError>;
}

/// A deferred server credential: resolved from the source on every call,
/// never cached across hosts.
#[derive(Clone)]
pub struct ServerCredential {
    protocol: String,
    host: String,
    source: Option<Arc<dyn CredentialSource>>,
}

impl ServerCredential {
    pub fn deferred(
        protocol: impl Into<String>,
        host: impl Into<String>,
        source: Option<Arc<dyn CredentialSource>>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            source,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Ask the source for the credential. A realm without a configured
    /// source fails here, at request time, like any unprovisioned pair.
    pub fn resolve(&self) -> Result<ServiceCredential, RealmError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| RealmError::CredentialUnavailable {
                protocol: self.protocol.clone(),
                host: self.host.clone(),
            })?;
        source.credential_for(&self.protocol, &self.host)
    }
}

impl core::fmt::Debug for ServerCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerCredential")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// One named principal transformation step.
#[derive(Clone)]
pub enum RewriteStep {
    /// Wrap the raw authenticated name as the canonical realm-scoped user.
    CanonicalizeRealmUser { realm: RealmName },
    /// Apply the owning handler service's own principal mapper.
    HandlerMapper { service: Arc<dyn HandlerService> },
}

impl RewriteStep {
    pub fn name(&self) -> &'static str {
        match self {
            RewriteStep::CanonicalizeRealmUser { .. } => "canonicalize-realm-user",
            RewriteStep::HandlerMapper { .. } => "handler-mapper",
        }
    }

    fn apply(&self, principal: Principal) -> Principal {
        match self {
            RewriteStep::CanonicalizeRealmUser { realm } => {
                Principal::realm_user(realm.clone(), principal.name())
            }
            RewriteStep::HandlerMapper { service } => service.map_principal(principal),
        }
    }
}

impl core::fmt::Debug for RewriteStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered list of rewrite steps applied in sequence.
#[derive(Debug, Clone, Default)]
pub struct PrincipalRewriter {
    steps: Vec<RewriteStep>,
}

impl PrincipalRewriter {
    pub fn new(steps: Vec<RewriteStep>) -> Self {
        Self { steps }
    }

    pub fn apply(&self, principal: Principal) -> Principal {
        self.steps
            .iter()
            .fold(principal, |p, step| step.apply(p))
    }

    /// Step names in application order, for audit.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(RewriteStep::name).collect()
    }
}

/// Everything the outer authentication factory needs to know about the
/// mechanism selected for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechanismInfo {
    pub transport: Transport,
    pub mechanism_name: String,
    pub protocol: String,
    pub host: String,
}

impl MechanismInfo {
    /// The protocol used for credential resolution. Both http and https
    /// collapse to "HTTP"; wire requests keep their own protocol name.
    pub fn credential_protocol(&self) -> &str {
        match self.transport {
            Transport::Http => "HTTP",
            Transport::Wire => &self.protocol,
        }
    }
}

/// Configuration bundle for one mechanism.
#[derive(Debug, Clone)]
pub struct MechanismConfig {
    mechanism: AuthMechanism,
    mechanism_realm: RealmName,
    rewriter: PrincipalRewriter,
    server_credential: Option<ServerCredential>,
}

impl MechanismConfig {
    pub(crate) fn new(
        mechanism: AuthMechanism,
        mechanism_realm: RealmName,
        rewriter: PrincipalRewriter,
    ) -> Self {
        Self {
            mechanism,
            mechanism_realm,
            rewriter,
            server_credential: None,
        }
    }

    /// Rebuild this configuration with a per-request deferred credential,
    /// keeping the statically built rewriter and realm binding.
    pub(crate) fn with_server_credential(&self, credential: ServerCredential) -> Self {
        Self {
            mechanism: self.mechanism,
            mechanism_realm: self.mechanism_realm.clone(),
            rewriter: self.rewriter.clone(),
            server_credential: Some(credential),
        }
    }

    pub fn mechanism(&self) -> AuthMechanism {
        self.mechanism
    }

    /// The realm name advertised to the mechanism.
    pub fn mechanism_realm(&self) -> &RealmName {
        &self.mechanism_realm
    }

    /// Constant realm mapping: every mechanism authenticates against its own
    /// isolated realm partition, named after the mechanism itself.
    pub fn realm_partition(&self) -> String {
        self.mechanism.to_string()
    }

    pub fn rewriter(&self) -> &PrincipalRewriter {
        &self.rewriter
    }

    pub fn server_credential(&self) -> Option<&ServerCredential> {
        self.server_credential.as_ref()
    }
}
