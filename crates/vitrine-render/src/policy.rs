//! Sandbox capability set for preview frames.
//!
//! Only the tokens below are representable. Top-level navigation, popup escape,
//! modals, and downloads are never granted to bundle content.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SandboxCapability {
    Scripts,
    SameOrigin,
    Forms,
    PointerLock,
    Popups,
    Presentation,
}

/// Tokens that must never reach a preview frame.
pub const FORBIDDEN_SANDBOX_TOKENS: &[&str] = &[
    "allow-top-navigation",
    "allow-top-navigation-by-user-activation",
    "allow-top-navigation-to-custom-protocols",
    "allow-popups-to-escape-sandbox",
    "allow-modals",
    "allow-downloads",
    "allow-orientation-lock",
    "allow-storage-access-by-user-activation",
];

impl SandboxCapability {
    pub fn token(self) -> &'static str {
        match self {
            SandboxCapability::Scripts => "allow-scripts",
            SandboxCapability::SameOrigin => "allow-same-origin",
            SandboxCapability::Forms => "allow-forms",
            SandboxCapability::PointerLock => "allow-pointer-lock",
            SandboxCapability::Popups => "allow-popups",
            SandboxCapability::Presentation => "allow-presentation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxPolicyError {
    #[error("sandbox token '{0}' is never granted to preview content")]
    Forbidden(String),
    #[error("unknown sandbox token '{0}'")]
    Unknown(String),
    #[error("unknown sandbox profile '{0}'; expected interactive|document")]
    UnknownProfile(String),
}

impl FromStr for SandboxCapability {
    type Err = SandboxPolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let token = value.trim().to_ascii_lowercase();
        match token.as_str() {
            "allow-scripts" => Ok(Self::Scripts),
            "allow-same-origin" => Ok(Self::SameOrigin),
            "allow-forms" => Ok(Self::Forms),
            "allow-pointer-lock" => Ok(Self::PointerLock),
            "allow-popups" => Ok(Self::Popups),
            "allow-presentation" => Ok(Self::Presentation),
            other if FORBIDDEN_SANDBOX_TOKENS.contains(&other) => {
                Err(SandboxPolicyError::Forbidden(other.to_string()))
            }
            other => Err(SandboxPolicyError::Unknown(other.to_string())),
        }
    }
}

/// Ordered, de-duplicated capability set applied to every preview frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    capabilities: Vec<SandboxCapability>,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self::interactive()
    }
}

impl SandboxPolicy {
    pub fn new(capabilities: impl IntoIterator<Item = SandboxCapability>) -> Self {
        let mut capabilities: Vec<_> = capabilities.into_iter().collect();
        capabilities.sort();
        capabilities.dedup();
        Self { capabilities }
    }

    /// Demo and interactive content: scripts, same-origin storage, forms,
    /// pointer lock, popups, and presentation.
    pub fn interactive() -> Self {
        Self::new([
            SandboxCapability::Scripts,
            SandboxCapability::SameOrigin,
            SandboxCapability::Forms,
            SandboxCapability::PointerLock,
            SandboxCapability::Popups,
            SandboxCapability::Presentation,
        ])
    }

    /// Static documents: no popups or presentation.
    pub fn document() -> Self {
        Self::new([
            SandboxCapability::Scripts,
            SandboxCapability::SameOrigin,
            SandboxCapability::Forms,
            SandboxCapability::PointerLock,
        ])
    }

    pub fn from_profile(profile: &str) -> Result<Self, SandboxPolicyError> {
        match profile.trim().to_ascii_lowercase().as_str() {
            "interactive" => Ok(Self::interactive()),
            "document" => Ok(Self::document()),
            other => Err(SandboxPolicyError::UnknownProfile(other.to_string())),
        }
    }

    /// Parses a space-separated token list, rejecting forbidden and unknown tokens.
    pub fn parse_tokens(raw: &str) -> Result<Self, SandboxPolicyError> {
        let capabilities = raw
            .split_whitespace()
            .map(SandboxCapability::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(capabilities))
    }

    pub fn allows(&self, capability: SandboxCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn capabilities(&self) -> &[SandboxCapability] {
        &self.capabilities
    }

    /// Value for the frame's `sandbox` attribute.
    pub fn attribute_value(&self) -> String {
        self.capabilities
            .iter()
            .map(|capability| capability.token())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value for a `Content-Security-Policy` header applying the same sandbox.
    pub fn csp_header_value(&self) -> String {
        let tokens = self.attribute_value();
        if tokens.is_empty() {
            "sandbox".to_string()
        } else {
            format!("sandbox {tokens}")
        }
    }
}

impl fmt::Display for SandboxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.attribute_value())
    }
}
