//! Priority ordering for advertised mechanism wire names.
//!
//! When an outer layer advertises several simultaneously valid mechanisms
//! (e.g. in a challenge list) they are sorted strongest first. The table is
//! fixed: certificate-based beats local-trusted-user beats Kerberos/SPNEGO
//! beats everything else.

use std::cmp::Ordering;

fn priority(name: &str) -> u8 {
    match name {
        "EXTERNAL" => 15,
        "JBOSS-LOCAL-USER" => 10,
        "GSSAPI" | "SPNEGO" => 5,
        _ => 0,
    }
}

/// Compare two wire names for a strongest-first stable sort.
///
/// Equal priorities compare `Equal`, so a stable sort preserves their
/// relative input order.
pub fn compare(a: &str, b: &str) -> Ordering {
    priority(b).cmp(&priority(a))
}

/// Sort a list of advertised wire names from strongest to weakest.
pub fn priority_order(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| compare(a, b));
    names
}
