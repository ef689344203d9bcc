//! Identifier types.
//!
//! Two families live here:
//!
//! - **Template keys** (`NodeId`, `ConnectorId`, `ImitationId`,
//!   `ImitationConnectionPos`) name entries of the template definitions and
//!   imitation tags. They are plain values compared by content.
//! - **Arena handles** (`NodeIndex`, `ConnectorIndex`, `WorkspaceIndex`)
//!   address live instances inside a [`NodeModel`](crate::NodeModel). Slots
//!   are never reused, so a handle stays valid for the model's lifetime.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

macro_rules! template_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            /// The empty key, meaning "not specified".
            pub const NONE: $name = $name(Cow::Borrowed(""));

            pub fn new(id: impl Into<String>) -> Self {
                Self(Cow::Owned(id.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_none(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NONE
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }
    };
}

template_key!(
    /// Identifier of a node template.
    NodeId
);

template_key!(
    /// Identifier of a connector template.
    ConnectorId
);

template_key!(
    /// Imitation tag selecting which imitation template applies.
    ImitationId
);

template_key!(
    /// Tag marking the connector an imitation child is attached to.
    ImitationConnectionPos
);

impl ImitationId {
    /// Reserved tag used when the user creates an imitation by hand.
    pub const MANUAL: ImitationId = ImitationId(Cow::Borrowed("imitIdManual"));
}

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub(crate) fn from_usize(index: usize) -> Self {
                Self(index as u32)
            }

            pub(crate) fn get(self) -> usize {
                self.0 as usize
            }

            /// Raw slot number, mostly useful for diagnostics.
            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_index!(
    /// Handle of a node instance.
    NodeIndex,
    "node"
);

arena_index!(
    /// Handle of a connector instance.
    ConnectorIndex,
    "connector"
);

arena_index!(
    /// Handle of a workspace.
    WorkspaceIndex,
    "workspace"
);
