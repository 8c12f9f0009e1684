pub type MapgifResult<T> = Result<T, MapgifError>;

#[derive(thiserror::Error, Debug)]
pub enum MapgifError {
    /// The WAD container could not be read or is corrupt.
    #[error("load error: {0}")]
    Load(String),

    /// The requested map is not present in the WAD.
    #[error("map not found: {0}")]
    NotFound(String),

    /// The map uses a record layout this crate cannot parse.
    #[error("unsupported map format: {0}")]
    UnsupportedFormat(String),

    /// The map has no spatial extent, so no scale can be computed.
    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MapgifError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Errors that only affect one map; batch rendering skips them and moves on.
    pub fn is_per_map(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::UnsupportedFormat(_) | Self::Geometry(_) | Self::Load(_)
        )
    }
}
