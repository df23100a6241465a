pub mod png;
pub mod size;
pub mod source;

pub use size::{parse_size, DEFAULT_SIZE};
pub use source::{AcceleratorCache, Device, HostOnly, ImageSource, PixelTensor};

use crate::{config::ServiceConfig, error::Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Owns the image and video output directories of a server process and turns
/// generated images into PNG payloads or links.
#[derive(Clone)]
pub struct MediaStore {
    service_url: String,
    image_dir: PathBuf,
    video_dir: PathBuf,
    accelerator: Arc<dyn AcceleratorCache>,
}

impl MediaStore {
    /// Creates `images/` and `videos/` under the configured root if missing.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let image_dir = config.image_dir();
        ensure_dir(&image_dir)?;
        let video_dir = config.video_dir();
        ensure_dir(&video_dir)?;

        Ok(Self {
            service_url: config.service_url,
            image_dir,
            video_dir,
            accelerator: Arc::new(HostOnly),
        })
    }

    pub fn with_accelerator(mut self, accelerator: Arc<dyn AcceleratorCache>) -> Self {
        self.accelerator = accelerator;
        self
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    pub fn parse_size(&self, size: Option<&str>, default: (u32, u32)) -> (u32, u32) {
        parse_size(size, default)
    }

    /// Encodes the image as an optimized PNG and returns it base64-encoded.
    pub fn image_to_b64(&self, image: impl Into<ImageSource>) -> Result<String> {
        let bitmap = image.into().into_bitmap()?;
        let data = png::encode_png(&bitmap)?;
        Ok(STANDARD.encode(data))
    }

    /// Writes the image to the image directory and returns its public URL.
    ///
    /// The image is consumed and freed before the accelerator cache is released.
    pub fn save_image(&self, image: impl Into<ImageSource>) -> Result<String> {
        let bitmap = image.into().into_bitmap()?;

        let filename = new_image_filename();
        let image_path = self.image_dir.join(&filename);
        log::info!("Saving image to {}", image_path.display());

        let mut writer = BufWriter::new(File::create(&image_path)?);
        png::write_png(&bitmap, &mut writer)?;
        writer.flush()?;

        drop(bitmap);
        self.accelerator.release();

        Ok(format!("{}/images/{}", self.service_url, filename))
    }
}

/// `img` followed by the first segment of a fresh v4 UUID.
fn new_image_filename() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("img{}.png", &id[..8])
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)?;
    log::debug!("Created media directory {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> MediaStore {
        let config = ServiceConfig::new()
            .with_root_dir(dir.path())
            .with_service_url("http://127.0.0.1:8500");
        MediaStore::new(config).unwrap()
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8])
        }))
    }

    #[derive(Default)]
    struct CountingCache(AtomicUsize);

    impl AcceleratorCache for CountingCache {
        fn release(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_new_creates_media_dirs() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.image_dir().is_dir());
        assert!(store.video_dir().is_dir());
        assert_eq!(store.image_dir(), dir.path().join("images"));

        // Existing directories are left alone.
        assert!(MediaStore::new(ServiceConfig::new().with_root_dir(dir.path())).is_ok());
    }

    #[test]
    fn test_image_to_b64_is_deterministic_png() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let image = gradient(32, 16);

        let first = store.image_to_b64(image.clone()).unwrap();
        let second = store.image_to_b64(image).unwrap();
        assert_eq!(first, second);

        let bytes = STANDARD.decode(&first).unwrap();
        assert!(png::is_png(&bytes));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert_eq!(decoded.to_rgb8().get_pixel(3, 2).0, [21, 26, 15]);
    }

    #[test]
    fn test_save_image_writes_png_at_url_suffix() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let url = store.save_image(gradient(8, 8)).unwrap();
        let filename = url
            .strip_prefix("http://127.0.0.1:8500/images/")
            .expect("url should point into images/");
        assert!(filename.starts_with("img"));
        assert!(filename.ends_with(".png"));
        assert_eq!(filename.len(), "img".len() + 8 + ".png".len());

        let bytes = fs::read(dir.path().join("images").join(filename)).unwrap();
        assert!(png::is_png(&bytes));
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_save_tensor_releases_accelerator_cache() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CountingCache::default());
        let store = store(&dir).with_accelerator(cache.clone());

        let tensor = PixelTensor::new(vec![1, 3, 4, 4], vec![0.5; 48])
            .unwrap()
            .on_device(Device::Accelerator(0));
        let first = store.save_image(tensor.clone()).unwrap();
        let second = store.save_image(tensor).unwrap();

        assert_ne!(first, second);
        assert_eq!(cache.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_tensor_propagates() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let tensor = PixelTensor::new(vec![5, 1, 1], vec![0.0; 5]).unwrap();
        assert!(store.save_image(tensor.clone()).is_err());
        assert!(store.image_to_b64(tensor).is_err());
    }

    #[test]
    fn test_parse_size_forwards_default() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.parse_size(Some("abcx100"), DEFAULT_SIZE), (1024, 1024));
        assert_eq!(store.parse_size(Some("320x200"), DEFAULT_SIZE), (320, 200));
    }
}
