//! `palisade-realm` — the authentication decision surface for a management
//! endpoint.
//!
//! A [`SecurityRealm`] is assembled once at startup from independently
//! contributed [`HandlerService`] back-ends and is read-only afterwards. Per
//! authentication attempt it hands out an [`AuthAttempt`] that runs the
//! two-phase callback protocol and merges every derived identity fact into
//! one [`palisade_core::Subject`].

pub mod attempt;
pub mod callback;
pub mod config;
pub mod error;
pub mod handler;
pub mod mechanism;
pub mod priority;
pub mod registry;

pub use attempt::{AuthAttempt, SharedState, LOADED_USERNAME_KEY, SKIP_GROUP_LOADING_KEY};
pub use callback::Callback;
pub use config::{
    CredentialSource, MechanismConfig, MechanismInfo, PrincipalRewriter, RewriteStep,
    ServerCredential, ServiceCredential,
};
pub use error::RealmError;
pub use handler::{HandlerService, SubjectSupplemental};
pub use mechanism::{AuthMechanism, Transport};
pub use priority::priority_order;
pub use registry::{SecurityRealm, SecurityRealmBuilder};
