use async_trait::async_trait;

use crate::domain::value_objects::CharaId;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Image not found upstream: {0}")]
    NotFound(String),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Which artwork of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Icon,
    Card,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icon => "icon",
            Self::Card => "card",
        }
    }
}

/// Resolves character artwork to PNG bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageResolverPort: Send + Sync {
    async fn resolve(&self, kind: ImageKind, id: &CharaId, star: u8) -> Result<Vec<u8>, ImageError>;

    /// Image shown when resolution fails
    async fn placeholder(&self, kind: ImageKind) -> Vec<u8>;
}
