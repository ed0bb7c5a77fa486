//! Route definitions supplied by upstream orchestrators.

use serde::{Deserialize, Serialize};

use crate::error::{ConductorError, ConductorResult};

/// What to do with a route in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Create or replace the route's fragments.
    #[default]
    Upsert,
    /// Delete every fragment owned by the route.
    Remove,
}

/// Where a frontend's rule block is injected relative to its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Normal,
    Top,
    Bottom,
}

/// A single ACL match token.
///
/// The kind is fixed when the token enters the data model: tokens starting
/// with `/` match a path prefix, anything else matches the host header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum AclMatch {
    HeaderMatch(String),
    PathPrefixMatch(String),
}

impl AclMatch {
    /// The raw token as supplied by the caller.
    pub fn token(&self) -> &str {
        match self {
            AclMatch::HeaderMatch(t) | AclMatch::PathPrefixMatch(t) => t,
        }
    }
}

impl From<String> for AclMatch {
    fn from(token: String) -> Self {
        if token.starts_with('/') {
            AclMatch::PathPrefixMatch(token)
        } else {
            AclMatch::HeaderMatch(token)
        }
    }
}

impl From<&str> for AclMatch {
    fn from(token: &str) -> Self {
        AclMatch::from(token.to_string())
    }
}

impl From<AclMatch> for String {
    fn from(m: AclMatch) -> Self {
        match m {
            AclMatch::HeaderMatch(t) | AclMatch::PathPrefixMatch(t) => t,
        }
    }
}

/// A named ACL with one or more match tokens selecting a backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AclRuleGroup {
    pub name: String,
    pub matches: Vec<AclMatch>,
    pub backend: String,
}

/// A frontend the route contributes rules to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Frontend {
    pub name: String,
    #[serde(default)]
    pub acl_groups: Vec<AclRuleGroup>,
    #[serde(default)]
    pub default_backend: Option<String>,
    #[serde(default)]
    pub placement: Placement,
}

/// One upstream server inside a backend pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Server {
    pub name: String,
    pub address: String,
    pub port: u16,
}

/// A backend block with its servers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendPool {
    pub name: String,
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Directive text appended verbatim to every server line.
    #[serde(default)]
    pub tail: String,
}

/// The unit being added, updated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceRoute {
    pub id: String,
    #[serde(default)]
    pub frontends: Vec<Frontend>,
    #[serde(default)]
    pub backends: Vec<BackendPool>,
    #[serde(default)]
    pub action: Action,
}

impl ServiceRoute {
    /// Removals only need a usable owner id.
    pub fn validate_id(&self) -> ConductorResult<()> {
        check_ident("route id", &self.id)
    }

    /// Check every identifier that ends up in a fragment name or directive.
    pub fn validate(&self) -> ConductorResult<()> {
        check_ident("route id", &self.id)?;

        for frontend in &self.frontends {
            check_ident("frontend name", &frontend.name)?;
            for group in &frontend.acl_groups {
                check_ident("acl name", &group.name)?;
                check_ident("acl backend", &group.backend)?;
                if group.matches.is_empty() {
                    return Err(ConductorError::InvalidRoute(format!(
                        "acl {} in route {} has no match tokens",
                        group.name, self.id
                    )));
                }
                for m in &group.matches {
                    if m.token().is_empty() || m.token().contains(char::is_whitespace) {
                        return Err(ConductorError::InvalidRoute(format!(
                            "acl {} has an invalid match token {:?}",
                            group.name,
                            m.token()
                        )));
                    }
                }
            }
            if let Some(default_backend) = &frontend.default_backend {
                check_ident("default backend", default_backend)?;
            }
        }

        for pool in &self.backends {
            check_ident("backend name", &pool.name)?;
            for server in &pool.servers {
                check_ident("server name", &server.name)?;
                if server.address.is_empty() || server.address.contains(char::is_whitespace) {
                    return Err(ConductorError::InvalidRoute(format!(
                        "server {} has an invalid address {:?}",
                        server.name, server.address
                    )));
                }
            }
            if pool.tail.contains('\n') {
                return Err(ConductorError::InvalidRoute(format!(
                    "backend {} tail must be a single line",
                    pool.name
                )));
            }
        }

        Ok(())
    }
}

fn check_ident(what: &str, value: &str) -> ConductorResult<()> {
    let bad = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '.');
    if bad {
        return Err(ConductorError::InvalidRoute(format!(
            "{} {:?} must be non-empty and contain no whitespace, '/' or '.'",
            what, value
        )));
    }
    Ok(())
}
