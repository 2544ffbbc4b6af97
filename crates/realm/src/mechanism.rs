//! Mechanism catalog: the closed set of supported authentication mechanisms
//! and the mapping from transport-specific wire names to them.

use serde::{Deserialize, Serialize};

/// A supported authentication mechanism.
///
/// The declaration order is the canonical iteration order for "supported
/// mechanisms" listings (the enum derives `Ord`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMechanism {
    Digest,
    ClientCert,
    Local,
    Kerberos,
    Plain,
}

impl core::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            AuthMechanism::Digest => "DIGEST",
            AuthMechanism::ClientCert => "CLIENT_CERT",
            AuthMechanism::Local => "LOCAL",
            AuthMechanism::Kerberos => "KERBEROS",
            AuthMechanism::Plain => "PLAIN",
        };
        f.write_str(name)
    }
}

/// Transport the mechanism name was advertised on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// The wire-level management protocol (SASL naming).
    Wire,
    /// The HTTP management interface.
    Http,
}

/// Resolve a transport-specific wire name to the canonical mechanism.
///
/// Unknown combinations return `None`: the name is simply not one of ours and
/// must be excluded from consideration, it is not an error.
pub fn resolve(transport: Transport, wire_name: &str) -> Option<AuthMechanism> {
    match transport {
        Transport::Wire => match wire_name {
            "DIGEST-MD5" => Some(AuthMechanism::Digest),
            "EXTERNAL" => Some(AuthMechanism::ClientCert),
            "JBOSS-LOCAL-USER" => Some(AuthMechanism::Local),
            "GSSAPI" => Some(AuthMechanism::Kerberos),
            "PLAIN" => Some(AuthMechanism::Plain),
            _ => None,
        },
        Transport::Http => match wire_name {
            "DIGEST" => Some(AuthMechanism::Digest),
            "CLIENT_CERT" => Some(AuthMechanism::ClientCert),
            "SPNEGO" => Some(AuthMechanism::Kerberos),
            "BASIC" => Some(AuthMechanism::Plain),
            _ => None,
        },
    }
}
