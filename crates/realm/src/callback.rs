//! Callback batch exchanged between the transport and a handler service.
//!
//! A callback is a request/response slot: the transport fills in what it
//! knows, the handler answers in place. The engine only inspects batch shape
//! (to decide whether to append a subject request) and never interprets
//! credentials itself.

use palisade_core::Subject;

/// One request/response slot in a callback batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// The name the remote peer is authenticating as. Handlers may rewrite
    /// it (e.g. after case canonicalization against their store).
    Name { name: String },

    /// Verify a cleartext password; the handler answers in `verified`.
    VerifyPassword {
        name: String,
        password: String,
        verified: Option<bool>,
    },

    /// Check that the authenticated identity may act as the requested
    /// authorization identity; the handler answers in `authorized`.
    Authorize {
        authentication_id: String,
        authorization_id: String,
        authorized: Option<bool>,
    },

    /// Request for an explicit subject built during the authentication
    /// phase. Appended by the engine, answered by handlers that support
    /// subject passing.
    Subject { subject: Option<Subject> },
}

impl Callback {
    pub fn is_authorize(&self) -> bool {
        matches!(self, Callback::Authorize { .. })
    }

    pub fn is_subject(&self) -> bool {
        matches!(self, Callback::Subject { .. })
    }

    /// Short label for diagnostics and unsupported-callback errors.
    pub fn label(&self) -> &'static str {
        match self {
            Callback::Name { .. } => "name",
            Callback::VerifyPassword { .. } => "verify-password",
            Callback::Authorize { .. } => "authorize",
            Callback::Subject { .. } => "subject",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_each_slot() {
        let cb = Callback::Authorize {
            authentication_id: "alice".into(),
            authorization_id: "alice".into(),
            authorized: None,
        };
        assert!(cb.is_authorize());
        assert_eq!(cb.label(), "authorize");
        assert_eq!(Callback::Subject { subject: None }.label(), "subject");
    }
}
