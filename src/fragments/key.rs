//! Fragment naming convention.
//!
//! ```text
//! {owner}.{kind}              backend, globalcfg, defaultcfg, frontendcfg
//! {owner}.{frontend}.{kind}   frontend, frontendtop, frontendbottom,
//!                             default_backend, frontendcfg
//! ```

use std::fmt;

/// The kind of a fragment, encoded as its file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FragmentKind {
    GlobalCfg,
    DefaultCfg,
    FrontendCfg,
    FrontendTop,
    Frontend,
    FrontendBottom,
    DefaultBackend,
    Backend,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 8] = [
        FragmentKind::GlobalCfg,
        FragmentKind::DefaultCfg,
        FragmentKind::FrontendCfg,
        FragmentKind::FrontendTop,
        FragmentKind::Frontend,
        FragmentKind::FrontendBottom,
        FragmentKind::DefaultBackend,
        FragmentKind::Backend,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            FragmentKind::GlobalCfg => "globalcfg",
            FragmentKind::DefaultCfg => "defaultcfg",
            FragmentKind::FrontendCfg => "frontendcfg",
            FragmentKind::FrontendTop => "frontendtop",
            FragmentKind::Frontend => "frontend",
            FragmentKind::FrontendBottom => "frontendbottom",
            FragmentKind::DefaultBackend => "default_backend",
            FragmentKind::Backend => "backend",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.suffix() == suffix)
    }

    /// Kinds that always belong to a named frontend.
    pub fn requires_frontend(self) -> bool {
        matches!(
            self,
            FragmentKind::FrontendTop
                | FragmentKind::Frontend
                | FragmentKind::FrontendBottom
                | FragmentKind::DefaultBackend
        )
    }

    /// Kinds that may carry a frontend qualifier.
    pub fn allows_frontend(self) -> bool {
        self.requires_frontend() || self == FragmentKind::FrontendCfg
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Identity of one persisted fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey {
    pub owner: String,
    pub frontend: Option<String>,
    pub kind: FragmentKind,
}

impl FragmentKey {
    /// Key for a frontend-independent fragment.
    pub fn global(owner: impl Into<String>, kind: FragmentKind) -> Self {
        Self {
            owner: owner.into(),
            frontend: None,
            kind,
        }
    }

    /// Key for a fragment scoped to one frontend.
    pub fn scoped(
        owner: impl Into<String>,
        frontend: impl Into<String>,
        kind: FragmentKind,
    ) -> Self {
        Self {
            owner: owner.into(),
            frontend: Some(frontend.into()),
            kind,
        }
    }

    pub fn file_name(&self) -> String {
        match &self.frontend {
            Some(frontend) => format!("{}.{}.{}", self.owner, frontend, self.kind),
            None => format!("{}.{}", self.owner, self.kind),
        }
    }

    /// Parse a file name. Returns `None` for anything outside the convention.
    pub fn parse(file_name: &str) -> Option<Self> {
        let parts: Vec<&str> = file_name.split('.').collect();
        match parts.as_slice() {
            [owner, suffix] if !owner.is_empty() => {
                let kind = FragmentKind::from_suffix(suffix)?;
                if kind.requires_frontend() {
                    return None;
                }
                Some(Self::global(*owner, kind))
            }
            [owner, frontend, suffix] if !owner.is_empty() && !frontend.is_empty() => {
                let kind = FragmentKind::from_suffix(suffix)?;
                if !kind.allows_frontend() {
                    return None;
                }
                Some(Self::scoped(*owner, *frontend, kind))
            }
            _ => None,
        }
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let key = FragmentKey::global("checkout", FragmentKind::Backend);
        assert_eq!(key.file_name(), "checkout.backend");

        let key = FragmentKey::scoped("checkout", "public", FragmentKind::DefaultBackend);
        assert_eq!(key.file_name(), "checkout.public.default_backend");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            FragmentKey::parse("base.globalcfg"),
            Some(FragmentKey::global("base", FragmentKind::GlobalCfg))
        );
        assert_eq!(
            FragmentKey::parse("base.public.frontendcfg"),
            Some(FragmentKey::scoped("base", "public", FragmentKind::FrontendCfg))
        );
        assert_eq!(
            FragmentKey::parse("checkout.public.frontendtop"),
            Some(FragmentKey::scoped("checkout", "public", FragmentKind::FrontendTop))
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        // scoped kinds need a frontend
        assert_eq!(FragmentKey::parse("checkout.frontend"), None);
        // backends are never frontend-scoped
        assert_eq!(FragmentKey::parse("checkout.public.backend"), None);
        assert_eq!(FragmentKey::parse("checkout.backend.tmp"), None);
        assert_eq!(FragmentKey::parse(".globalcfg"), None);
        assert_eq!(FragmentKey::parse("README"), None);
    }
}
