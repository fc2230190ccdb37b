//! `tweny://` links fired by widget and lock-screen tap targets.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ValidationError;

pub const SCHEME: &str = "tweny";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLink {
    /// Bring the live session to the foreground.
    Open,
    Toggle,
    Stop,
}

impl DeepLink {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let unsupported = || ValidationError::UnsupportedLink(raw.to_string());
        let url = Url::parse(raw.trim()).map_err(|_| unsupported())?;
        if url.scheme() != SCHEME {
            return Err(unsupported());
        }
        match url.host_str() {
            Some("open") => Ok(DeepLink::Open),
            Some("toggle") => Ok(DeepLink::Toggle),
            Some("stop") => Ok(DeepLink::Stop),
            _ => Err(unsupported()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeepLink::Open => "open",
            DeepLink::Toggle => "toggle",
            DeepLink::Stop => "stop",
        }
    }
}

impl FromStr for DeepLink {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://{}", self.as_str())
    }
}
