//! Realm assembly and the handler registry.
//!
//! A [`SecurityRealmBuilder`] collects contributed handler services during a
//! single-threaded startup phase; [`SecurityRealmBuilder::build`] detects
//! duplicate preferred-mechanism registrations (all-or-nothing) and derives
//! the per-mechanism configuration tables. The resulting [`SecurityRealm`]
//! is immutable and may be shared freely across concurrent attempts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use palisade_core::RealmName;

use crate::attempt::AuthAttempt;
use crate::config::{
    bundle_keys, CredentialSource, MechanismConfig, MechanismInfo, PrincipalRewriter,
    RewriteStep, ServerCredential, ALTERNATIVE_PROTOCOL,
};
use crate::error::RealmError;
use crate::handler::{option_keys, HandlerService, SubjectSupplemental};
use crate::mechanism::{resolve, AuthMechanism};

/// Startup-time collector for everything a [`SecurityRealm`] needs.
pub struct SecurityRealmBuilder {
    name: RealmName,
    challenge_token_dir: String,
    map_groups_to_roles: bool,
    services: Vec<Arc<dyn HandlerService>>,
    supplemental: Option<Arc<dyn SubjectSupplemental>>,
    credential_source: Option<Arc<dyn CredentialSource>>,
}

impl SecurityRealmBuilder {
    /// `challenge_token_dir` is the host-provisioned directory for local
    /// challenge tokens; it is carried as an opaque string, never created or
    /// validated here.
    pub fn new(name: impl Into<RealmName>, challenge_token_dir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            challenge_token_dir: challenge_token_dir.into(),
            map_groups_to_roles: false,
            services: Vec::new(),
            supplemental: None,
            credential_source: None,
        }
    }

    /// Project every loaded group principal to a role of the same name.
    pub fn map_groups_to_roles(mut self, enabled: bool) -> Self {
        self.map_groups_to_roles = enabled;
        self
    }

    pub fn register(mut self, service: Arc<dyn HandlerService>) -> Self {
        self.services.push(service);
        self
    }

    pub fn subject_supplemental(mut self, supplemental: Arc<dyn SubjectSupplemental>) -> Self {
        self.supplemental = Some(supplemental);
        self
    }

    pub fn credential_source(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credential_source = Some(source);
        self
    }

    /// Build the immutable realm.
    ///
    /// Registration is all-or-nothing: the first collision on a preferred
    /// mechanism aborts the whole build and no realm value exists, so a
    /// partially populated registry can never serve requests.
    pub fn build(self) -> Result<SecurityRealm, RealmError> {
        tracing::debug!(realm = %self.name, "building security realm");

        let mut services: BTreeMap<AuthMechanism, Arc<dyn HandlerService>> = BTreeMap::new();
        for service in self.services {
            let mechanism = service.preferred_mechanism();
            if services.contains_key(&mechanism) {
                return Err(RealmError::RegistrationConflict(mechanism));
            }
            services.insert(mechanism, service);
        }

        let mut configs = BTreeMap::new();
        let mut options_bundle = BTreeMap::new();
        for (mechanism, service) in &services {
            let rewriter = PrincipalRewriter::new(vec![
                RewriteStep::CanonicalizeRealmUser {
                    realm: self.name.clone(),
                },
                RewriteStep::HandlerMapper {
                    service: service.clone(),
                },
            ]);
            configs.insert(
                *mechanism,
                MechanismConfig::new(*mechanism, self.name.clone(), rewriter),
            );

            for (key, value) in service.configuration_options() {
                if key == option_keys::LOCAL_DEFAULT_USER {
                    options_bundle.insert(bundle_keys::LOCAL_DEFAULT_USER.to_string(), value);
                }
            }
        }

        options_bundle.insert(
            bundle_keys::LOCAL_CHALLENGE_PATH.to_string(),
            self.challenge_token_dir,
        );
        options_bundle.insert(
            bundle_keys::ALTERNATIVE_PROTOCOLS.to_string(),
            ALTERNATIVE_PROTOCOL.to_string(),
        );

        Ok(SecurityRealm {
            name: self.name,
            map_groups_to_roles: self.map_groups_to_roles,
            services,
            configs,
            options_bundle,
            supplemental: self.supplemental,
            credential_source: self.credential_source,
        })
    }
}

/// The assembled authentication decision surface.
///
/// Read-only after construction; shareable across threads without
/// synchronization. Per-attempt state lives in the [`AuthAttempt`] values it
/// hands out.
pub struct SecurityRealm {
    name: RealmName,
    map_groups_to_roles: bool,
    services: BTreeMap<AuthMechanism, Arc<dyn HandlerService>>,
    configs: BTreeMap<AuthMechanism, MechanismConfig>,
    options_bundle: BTreeMap<String, String>,
    supplemental: Option<Arc<dyn SubjectSupplemental>>,
    credential_source: Option<Arc<dyn CredentialSource>>,
}

impl SecurityRealm {
    pub fn name(&self) -> &RealmName {
        &self.name
    }

    /// Mechanisms with a registered preferring service, in canonical order.
    pub fn supported_mechanisms(&self) -> BTreeSet<AuthMechanism> {
        self.services.keys().copied().collect()
    }

    /// Declared options of the service resolved for `mechanism`.
    pub fn mechanism_options(
        &self,
        mechanism: AuthMechanism,
    ) -> Result<BTreeMap<String, String>, RealmError> {
        Ok(self.lookup(mechanism)?.configuration_options())
    }

    /// The flat options bundle assembled at build time (recognized handler
    /// options plus the injected challenge-path and protocol-alias entries).
    pub fn options_bundle(&self) -> &BTreeMap<String, String> {
        &self.options_bundle
    }

    /// True as soon as any registered service can answer an HTTP challenge.
    pub fn ready_for_http_challenge(&self) -> bool {
        self.services.values().any(|s| s.ready_for_http_challenge())
    }

    /// Resolve the advertised mechanism and produce its configuration.
    ///
    /// `None` means "not one of our mechanisms here" and excludes the name
    /// from consideration. Kerberos configurations are rebuilt per request
    /// with a deferred credential for the runtime (protocol, host) pair; all
    /// other mechanisms reuse the statically built configuration.
    pub fn config_for(&self, info: &MechanismInfo) -> Option<MechanismConfig> {
        let mechanism = resolve(info.transport, &info.mechanism_name)?;
        let config = self.configs.get(&mechanism)?;

        if mechanism == AuthMechanism::Kerberos {
            let credential = ServerCredential::deferred(
                info.credential_protocol(),
                info.host.clone(),
                self.credential_source.clone(),
            );
            return Some(config.with_server_credential(credential));
        }

        Some(config.clone())
    }

    /// Begin a fresh authentication attempt for `mechanism`.
    ///
    /// Resolves the handler service (preferred first, then supplementary
    /// claims) and scopes a new shared state to the attempt.
    pub fn begin_attempt(&self, mechanism: AuthMechanism) -> Result<AuthAttempt, RealmError> {
        let handler = self.lookup(mechanism)?.clone();
        let supplemental = if handler.allows_group_loading() {
            self.supplemental.clone()
        } else {
            None
        };

        tracing::debug!(realm = %self.name, %mechanism, "beginning authentication attempt");

        Ok(AuthAttempt::new(
            self.name.clone(),
            handler,
            supplemental,
            self.map_groups_to_roles,
        ))
    }

    fn lookup(&self, mechanism: AuthMechanism) -> Result<&Arc<dyn HandlerService>, RealmError> {
        if let Some(service) = self.services.get(&mechanism) {
            return Ok(service);
        }

        // No service prefers this mechanism; fall back to the first service
        // that also supports it.
        self.services
            .values()
            .find(|s| s.supplementary_mechanisms().contains(&mechanism))
            .ok_or_else(|| RealmError::MechanismNotFound {
                mechanism,
                realm: self.name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::SharedState;
    use crate::callback::Callback;
    use crate::config::ServiceCredential;
    use crate::mechanism::Transport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubHandler {
        preferred: AuthMechanism,
        supplementary: BTreeSet<AuthMechanism>,
        options: BTreeMap<String, String>,
        http_ready: bool,
    }

    impl StubHandler {
        fn new(preferred: AuthMechanism) -> Self {
            Self {
                preferred,
                supplementary: BTreeSet::new(),
                options: BTreeMap::new(),
                http_ready: false,
            }
        }

        fn with_supplementary(mut self, mechanisms: &[AuthMechanism]) -> Self {
            self.supplementary = mechanisms.iter().copied().collect();
            self
        }

        fn with_option(mut self, key: &str, value: &str) -> Self {
            self.options.insert(key.to_string(), value.to_string());
            self
        }

        fn http_ready(mut self) -> Self {
            self.http_ready = true;
            self
        }
    }

    impl HandlerService for StubHandler {
        fn preferred_mechanism(&self) -> AuthMechanism {
            self.preferred
        }

        fn supplementary_mechanisms(&self) -> BTreeSet<AuthMechanism> {
            self.supplementary.clone()
        }

        fn configuration_options(&self) -> BTreeMap<String, String> {
            self.options.clone()
        }

        fn ready_for_http_challenge(&self) -> bool {
            self.http_ready
        }

        fn handle_callbacks(
            &self,
            _callbacks: &mut [Callback],
            _state: &mut SharedState,
        ) -> Result<(), RealmError> {
            Ok(())
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CredentialSource for CountingSource {
        fn credential_for(
            &self,
            protocol: &str,
            host: &str,
        ) -> Result<ServiceCredential, RealmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ServiceCredential {
                service_principal: format!("{}/{}", protocol, host),
            })
        }
    }

    fn builder() -> SecurityRealmBuilder {
        SecurityRealmBuilder::new("mgmt", "/var/run/mgmt/auth")
    }

    #[test]
    fn supported_mechanisms_is_the_union_of_preferred_claims() {
        let realm = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Plain)))
            .register(Arc::new(StubHandler::new(AuthMechanism::Local)))
            .register(Arc::new(StubHandler::new(AuthMechanism::ClientCert)))
            .build()
            .unwrap();

        let supported: Vec<_> = realm.supported_mechanisms().into_iter().collect();
        assert_eq!(
            supported,
            vec![
                AuthMechanism::ClientCert,
                AuthMechanism::Local,
                AuthMechanism::Plain,
            ]
        );
    }

    #[test]
    fn duplicate_preferred_mechanism_fails_the_whole_build() {
        let result = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Digest)))
            .register(Arc::new(StubHandler::new(AuthMechanism::Digest)))
            .build();

        assert_eq!(
            result.err(),
            Some(RealmError::RegistrationConflict(AuthMechanism::Digest))
        );
    }

    #[test]
    fn lookup_falls_back_to_supplementary_claims() {
        let realm = builder()
            .register(Arc::new(
                StubHandler::new(AuthMechanism::Digest)
                    .with_supplementary(&[AuthMechanism::Plain]),
            ))
            .build()
            .unwrap();

        // PLAIN has no preferring service but the digest service supports it.
        assert!(realm.begin_attempt(AuthMechanism::Plain).is_ok());
        assert_eq!(
            realm.begin_attempt(AuthMechanism::Kerberos).err(),
            Some(RealmError::MechanismNotFound {
                mechanism: AuthMechanism::Kerberos,
                realm: RealmName::new("mgmt"),
            })
        );
    }

    #[test]
    fn mechanism_options_surface_the_resolved_service_options() {
        let realm = builder()
            .register(Arc::new(
                StubHandler::new(AuthMechanism::Local)
                    .with_option(option_keys::LOCAL_DEFAULT_USER, "$local"),
            ))
            .build()
            .unwrap();

        let options = realm.mechanism_options(AuthMechanism::Local).unwrap();
        assert_eq!(
            options.get(option_keys::LOCAL_DEFAULT_USER).map(String::as_str),
            Some("$local")
        );

        assert_eq!(
            realm.mechanism_options(AuthMechanism::Plain).err(),
            Some(RealmError::MechanismNotFound {
                mechanism: AuthMechanism::Plain,
                realm: RealmName::new("mgmt"),
            })
        );
    }

    #[test]
    fn options_bundle_receives_injected_entries() {
        let realm = builder()
            .register(Arc::new(
                StubHandler::new(AuthMechanism::Local)
                    .with_option(option_keys::LOCAL_DEFAULT_USER, "$local"),
            ))
            .build()
            .unwrap();

        let bundle = realm.options_bundle();
        assert_eq!(
            bundle.get(bundle_keys::LOCAL_CHALLENGE_PATH).map(String::as_str),
            Some("/var/run/mgmt/auth")
        );
        assert_eq!(
            bundle.get(bundle_keys::ALTERNATIVE_PROTOCOLS).map(String::as_str),
            Some(ALTERNATIVE_PROTOCOL)
        );
        assert_eq!(
            bundle.get(bundle_keys::LOCAL_DEFAULT_USER).map(String::as_str),
            Some("$local")
        );
    }

    #[test]
    fn http_challenge_ready_when_any_service_is() {
        let realm = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Plain)))
            .build()
            .unwrap();
        assert!(!realm.ready_for_http_challenge());

        let realm = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Plain)))
            .register(Arc::new(StubHandler::new(AuthMechanism::Digest).http_ready()))
            .build()
            .unwrap();
        assert!(realm.ready_for_http_challenge());
    }

    #[test]
    fn unknown_wire_names_are_excluded_from_configuration() {
        let realm = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Plain)))
            .build()
            .unwrap();

        let info = MechanismInfo {
            transport: Transport::Wire,
            mechanism_name: "SCRAM-SHA-256".into(),
            protocol: "remote".into(),
            host: "mgmt.example".into(),
        };
        assert!(realm.config_for(&info).is_none());

        // Known name, but no registered service for it.
        let info = MechanismInfo {
            transport: Transport::Wire,
            mechanism_name: "DIGEST-MD5".into(),
            protocol: "remote".into(),
            host: "mgmt.example".into(),
        };
        assert!(realm.config_for(&info).is_none());
    }

    #[test]
    fn kerberos_credential_is_resolved_per_request_never_cached() {
        let source = Arc::new(CountingSource::new());
        let realm = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Kerberos)))
            .credential_source(source.clone())
            .build()
            .unwrap();

        let info_a = MechanismInfo {
            transport: Transport::Wire,
            mechanism_name: "GSSAPI".into(),
            protocol: "remote".into(),
            host: "a.example".into(),
        };
        let info_b = MechanismInfo {
            transport: Transport::Http,
            mechanism_name: "SPNEGO".into(),
            protocol: "https".into(),
            host: "b.example".into(),
        };

        let cred_a = realm.config_for(&info_a).unwrap();
        let cred_a = cred_a.server_credential().unwrap().resolve().unwrap();
        let cred_b = realm.config_for(&info_b).unwrap();
        let cred_b = cred_b.server_credential().unwrap().resolve().unwrap();

        assert_eq!(cred_a.service_principal, "remote/a.example");
        assert_eq!(cred_b.service_principal, "HTTP/b.example");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        // Non-Kerberos configurations never carry a server credential.
        let realm = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Plain)))
            .build()
            .unwrap();
        let info = MechanismInfo {
            transport: Transport::Wire,
            mechanism_name: "PLAIN".into(),
            protocol: "remote".into(),
            host: "a.example".into(),
        };
        assert!(realm.config_for(&info).unwrap().server_credential().is_none());
    }

    #[test]
    fn kerberos_without_a_source_fails_at_resolution_time() {
        let realm = builder()
            .register(Arc::new(StubHandler::new(AuthMechanism::Kerberos)))
            .build()
            .unwrap();

        let info = MechanismInfo {
            transport: Transport::Wire,
            mechanism_name: "GSSAPI".into(),
            protocol: "remote".into(),
            host: "a.example".into(),
        };
        let config = realm.config_for(&info).unwrap();
        assert_eq!(
            config.server_credential().unwrap().resolve().err(),
            Some(RealmError::CredentialUnavailable {
                protocol: "remote".into(),
                host: "a.example".into(),
            })
        );
    }
}
