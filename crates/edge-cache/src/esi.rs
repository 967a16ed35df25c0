//! Edge Side Includes request state.

use edge_core::ServerKind;
use serde::{Deserialize, Serialize};

/// Header marker appended when the downstream cache must assemble fragments.
pub const ESI_ON: &str = ",esi=on";

/// ESI state of the current request, resolved by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsiContext {
    /// Block id when the request is itself an ESI sub-request.
    pub fragment_id: Option<String>,
    /// Whether the rendered page contains ESI blocks.
    pub has_esi: bool,
}

impl EsiContext {
    /// A top-level request without ESI blocks.
    pub fn none() -> Self {
        Self::default()
    }

    /// A top-level page that contains ESI blocks.
    pub fn with_blocks() -> Self {
        Self {
            fragment_id: None,
            has_esi: true,
        }
    }

    /// An ESI sub-request for the given block.
    pub fn fragment(block_id: impl Into<String>) -> Self {
        Self {
            fragment_id: Some(block_id.into()),
            has_esi: false,
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_id.is_some()
    }

    /// The `,esi=on` suffix, or empty when the server cannot honour it or
    /// the page has no ESI blocks.
    pub fn suffix(&self, server: ServerKind) -> &'static str {
        if server.supports_esi() && self.has_esi {
            ESI_ON
        } else {
            ""
        }
    }
}
