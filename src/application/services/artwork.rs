//! Character artwork helpers shared by the draw, lookup and guess use cases

use std::io::Cursor;

use tracing::warn;

use crate::application::ports::outbound::{ImageError, ImageKind, ImageResolverPort, RandomPort};
use crate::domain::value_objects::CharaId;

/// Resolve artwork, degrading to the placeholder image on any failure
pub async fn resolve_or_placeholder(
    images: &dyn ImageResolverPort,
    kind: ImageKind,
    id: &CharaId,
    star: u8,
) -> Vec<u8> {
    match images.resolve(kind, id, star).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(chara_id = %id, kind = kind.as_str(), error = %e, "Artwork unavailable, using placeholder");
            images.placeholder(kind).await
        }
    }
}

/// Cut a random square patch out of an image and return it as PNG.
///
/// The patch shrinks to the shorter image side when the image is smaller
/// than `patch_size`.
pub fn crop_patch(
    bytes: &[u8],
    patch_size: u32,
    random: &dyn RandomPort,
) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
    let (width, height) = (img.width(), img.height());
    let side = patch_size.min(width).min(height);
    if side == 0 {
        return Err(ImageError::Decode("empty image".to_string()));
    }

    let left = random.pick(0, width - side);
    let upper = random.pick(0, height - side);
    let patch = img.crop_imm(left, upper, side, side);

    let mut out = Cursor::new(Vec::new());
    patch
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    Ok(out.into_inner())
}
