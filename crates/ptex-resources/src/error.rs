use std::fmt;

/// Error raised while registering or reading a resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No group with this name has been registered.
    MissingGroup { group: String },
    /// The group exists but does not contain the requested file.
    MissingFile { group: String, name: String },
    /// The bundle failed validation and was not registered.
    Corrupt { group: String, reason: String },
}

impl ResourceError {
    pub(crate) fn corrupt(group: &str, reason: impl Into<String>) -> Self {
        Self::Corrupt { group: group.to_owned(), reason: reason.into() }
    }

    /// Name of the group the error refers to.
    pub fn group(&self) -> &str {
        match self {
            Self::MissingGroup { group }
            | Self::MissingFile { group, .. }
            | Self::Corrupt { group, .. } => group,
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGroup { group } => {
                write!(f, "resource group `{group}` is not registered")
            }
            Self::MissingFile { group, name } => {
                write!(f, "resource `{name}` not found in group `{group}`")
            }
            Self::Corrupt { group, reason } => {
                write!(f, "resource group `{group}` is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}
