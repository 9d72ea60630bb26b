use thiserror::Error;

/// The kind of record a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Environment,
    Tag,
    EdgeGroup,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Environment => "environment",
            EntityKind::Tag => "tag",
            EntityKind::EdgeGroup => "edge group",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RelationsError {
    #[error("not initialized: run 'envrel init'")]
    NotInitialized,

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: u32 },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("relation refresh failed: {0}")]
    Refresh(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RelationsError {
    pub fn not_found(kind: EntityKind, id: impl Into<u32>) -> Self {
        RelationsError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RelationsError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RelationsError>;
