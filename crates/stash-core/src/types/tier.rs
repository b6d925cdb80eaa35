//! Storage tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A storage location class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Fast, ephemeral storage where uploads land.
    Local,
    /// Durable storage populated by the external upload job.
    Cloud,
    /// Staging storage whose objects are served by URL.
    Public,
}

impl Tier {
    /// The tier holding a file payload, given its migration flag.
    pub fn for_payload(uploaded_on_cloud: bool) -> Self {
        if uploaded_on_cloud {
            Self::Cloud
        } else {
            Self::Local
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Cloud => write!(f, "cloud"),
            Self::Public => write!(f, "public"),
        }
    }
}
