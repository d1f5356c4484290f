//! Character artwork with a local PNG cache in front of the remote mirror
//!
//! Cache layout: `{cache}/icon/icon_unit_{id}{star}1.png` and
//! `{cache}/card/card_full_{id}{star}1.png`. The mirror serves webp; we
//! store and hand out PNG.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::application::ports::outbound::{ImageError, ImageKind, ImageResolverPort};
use crate::domain::value_objects::CharaId;

const PLACEHOLDER_SIDE: u32 = 128;

pub struct CachedImageResolver {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl CachedImageResolver {
    pub fn new(base_url: &str, cache_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, ImageError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
        })
    }

    fn cache_path(&self, kind: ImageKind, id: &CharaId, star: u8) -> PathBuf {
        let file = match kind {
            ImageKind::Icon => format!("icon_unit_{}{}1.png", id, star),
            ImageKind::Card => format!("card_full_{}{}1.png", id, star),
        };
        self.cache_dir.join(kind.as_str()).join(file)
    }

    fn remote_url(&self, kind: ImageKind, id: &CharaId, star: u8) -> String {
        match kind {
            ImageKind::Icon => format!("{}/icon/unit/{}{}1.webp", self.base_url, id, star),
            ImageKind::Card => format!("{}/card/full/{}{}1.webp", self.base_url, id, star),
        }
    }

    /// Stars to try, in order: the requested one, then the fallbacks
    fn star_candidates(kind: ImageKind, star: u8) -> Vec<u8> {
        let fallbacks: &[u8] = match kind {
            ImageKind::Icon => &[3, 1],
            ImageKind::Card => &[3],
        };
        let mut stars = vec![star];
        for s in fallbacks {
            if !stars.contains(s) {
                stars.push(*s);
            }
        }
        stars
    }

    async fn fetch_one(&self, kind: ImageKind, id: &CharaId, star: u8) -> Result<Vec<u8>, ImageError> {
        let path = self.cache_path(kind, id, star);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), "Artwork cache hit");
                return Ok(bytes);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ImageError::Cache(e.to_string())),
        }

        let url = self.remote_url(kind, id, star);
        debug!(url = %url, "Downloading artwork");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ImageError::NotFound(url)),
            s => return Err(ImageError::Http(format!("{} returned HTTP {}", url, s))),
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?;
        let png = to_png(&body)?;
        store(&path, &png).await?;
        info!(path = %path.display(), "Saved artwork");
        Ok(png)
    }
}

fn to_png(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Write through a temporary file so readers never see a partial image
async fn store(path: &Path, bytes: &[u8]) -> Result<(), ImageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ImageError::Cache(e.to_string()))?;
    }
    let tmp = path.with_extension(format!("{}.part", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| ImageError::Cache(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ImageError::Cache(e.to_string()))
}

fn blank_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(PLACEHOLDER_SIDE, PLACEHOLDER_SIDE, image::Rgba([200, 200, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    match image::DynamicImage::ImageRgba8(img).write_to(&mut out, image::ImageFormat::Png) {
        Ok(()) => out.into_inner(),
        Err(e) => {
            warn!(error = %e, "Failed to encode placeholder");
            Vec::new()
        }
    }
}

#[async_trait]
impl ImageResolverPort for CachedImageResolver {
    async fn resolve(&self, kind: ImageKind, id: &CharaId, star: u8) -> Result<Vec<u8>, ImageError> {
        let mut last_err = None;
        for candidate in Self::star_candidates(kind, star) {
            match self.fetch_one(kind, id, candidate).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    debug!(chara_id = %id, star = candidate, error = %e, "Artwork not available");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ImageError::NotFound(id.to_string())))
    }

    /// The unknown character's cached icon, or a flat grey square
    async fn placeholder(&self, _kind: ImageKind) -> Vec<u8> {
        let path = self
            .cache_dir
            .join(ImageKind::Icon.as_str())
            .join(format!("icon_unit_{}.png", CharaId::UNKNOWN));
        match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => blank_png(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::test_png;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Nothing listens on the discard port, so downloads fail fast
    const OFFLINE: &str = "http://127.0.0.1:9/";

    fn resolver(dir: &tempfile::TempDir) -> CachedImageResolver {
        CachedImageResolver::new(OFFLINE, dir.path(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_paths_and_urls() {
        let dir = tempfile::tempdir().unwrap();
        let images = resolver(&dir);
        let id = CharaId::from("1018");
        assert!(images
            .cache_path(ImageKind::Card, &id, 6)
            .ends_with("card/card_full_101861.png"));
        assert_eq!(
            images.remote_url(ImageKind::Icon, &id, 3),
            "http://127.0.0.1:9/icon/unit/101831.webp"
        );
        assert_eq!(CachedImageResolver::star_candidates(ImageKind::Icon, 6), vec![6, 3, 1]);
        assert_eq!(CachedImageResolver::star_candidates(ImageKind::Card, 3), vec![3]);
    }

    #[tokio::test]
    async fn test_cache_hit_and_star_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let images = resolver(&dir);
        let id = CharaId::from("1018");
        let png = test_png(16);
        store(&images.cache_path(ImageKind::Card, &id, 3), &png).await.unwrap();

        // 6-star is not cached and the mirror is unreachable, 3-star is cached
        let bytes = images.resolve(ImageKind::Card, &id, 6).await.unwrap();
        assert_eq!(bytes, png);
    }

    #[tokio::test]
    async fn test_unreachable_mirror_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let images = resolver(&dir);
        let err = images
            .resolve(ImageKind::Icon, &CharaId::from("1060"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Http(_)));
    }

    #[tokio::test]
    async fn test_placeholder_is_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let images = resolver(&dir);
        let bytes = images.placeholder(ImageKind::Card).await;
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), PLACEHOLDER_SIDE);
    }

    fn test_jpeg(side: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(side, side, image::Rgb([10, 120, 200]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    /// Local mirror serving one icon; returns its base URL and a hit counter
    async fn serve_mirror(body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
        use axum::{extract::Path as UrlPath, http::StatusCode as Status, routing::get, Router};

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/icon/unit/{file}",
            get(move |UrlPath(file): UrlPath<String>| {
                let body = body.clone();
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if file == "101831.webp" {
                        Ok(body)
                    } else {
                        Err(Status::NOT_FOUND)
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    #[tokio::test]
    async fn test_download_fills_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (mirror, hits) = serve_mirror(test_jpeg(24)).await;
        let images = CachedImageResolver::new(&mirror, dir.path(), Duration::from_secs(5)).unwrap();
        let id = CharaId::from("1018");

        // 6-star is missing on the mirror, 3-star is served
        let bytes = images.resolve(ImageKind::Icon, &id, 6).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
        assert_eq!(image::load_from_memory(&bytes).unwrap().width(), 24);

        let cached = images.cache_path(ImageKind::Icon, &id, 3);
        assert_eq!(tokio::fs::read(&cached).await.unwrap(), bytes);
        assert!(!images.cache_path(ImageKind::Icon, &id, 6).exists());

        // served from disk now, the mirror is not asked again
        let again = images.resolve(ImageKind::Icon, &id, 3).await.unwrap();
        assert_eq!(again, bytes);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mirror_404_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (mirror, _) = serve_mirror(test_jpeg(8)).await;
        let images = CachedImageResolver::new(&mirror, dir.path(), Duration::from_secs(5)).unwrap();

        let err = images
            .resolve(ImageKind::Icon, &CharaId::from("1060"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::NotFound(_)));
    }

    #[test]
    fn test_to_png_rejects_garbage() {
        assert!(matches!(to_png(b"not an image"), Err(ImageError::Decode(_))));
    }
}
