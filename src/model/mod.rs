//! Request-scoped data model.
//!
//! # Data Flow
//! ```text
//! JSON batch from orchestrator
//!     → changeset.rs (RouteBatch, ChangeSetId, ReloadMode)
//!     → route.rs (ServiceRoute → Frontend/AclRuleGroup/BackendPool)
//!     → fragments::render (route → fragment bodies)
//! ```
//!
//! # Design Decisions
//! - ACL match kind is decided once, at deserialization
//! - Identifiers are validated before any fragment is touched
//! - None of these types are persisted directly

pub mod changeset;
pub mod route;

pub use changeset::{ChangeSetId, ChangeSetStatus, ReloadMode, RouteBatch};
pub use route::{
    AclMatch, AclRuleGroup, Action, BackendPool, Frontend, Placement, Server, ServiceRoute,
};
