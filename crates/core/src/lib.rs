//! `palisade-core` — identity vocabulary shared across the workspace.
//!
//! This crate contains **pure identity** primitives (no engine logic, no IO):
//! realm names, tagged principals and the subject container they merge into.

pub mod principal;
pub mod realm;
pub mod subject;

pub use principal::Principal;
pub use realm::RealmName;
pub use subject::Subject;
