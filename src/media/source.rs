use crate::error::{KitError, Result};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

/// Where a tensor's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Host,
    Accelerator(usize),
}

/// Float pixel data in channel-first layout, values nominally in `[0, 1]`.
///
/// Accepted shapes are `[1, C, H, W]`, `[C, H, W]` and `[H, W]`, with `C` one
/// of 1, 3 or 4.
#[derive(Debug, Clone)]
pub struct PixelTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
    device: Device,
}

impl PixelTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(KitError::Tensor(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            shape,
            data,
            device: Device::Host,
        })
    }

    pub fn on_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn to_host(mut self) -> Self {
        self.device = Device::Host;
        self
    }

    /// Drops a leading batch dimension of size one.
    pub fn squeeze_batch(mut self) -> Self {
        if self.shape.len() == 4 && self.shape[0] == 1 {
            self.shape.remove(0);
        }
        self
    }

    pub fn clamp(mut self, min: f32, max: f32) -> Self {
        for v in self.data.iter_mut() {
            *v = v.clamp(min, max);
        }
        self
    }

    /// Scales to `0..=255` (truncating) and interleaves channels into a bitmap.
    pub fn into_bitmap(self) -> Result<DynamicImage> {
        let (channels, height, width) = match self.shape.as_slice() {
            [h, w] => (1, *h, *w),
            [c, h, w] => (*c, *h, *w),
            other => {
                return Err(KitError::Tensor(format!(
                    "cannot convert shape {:?} to an image",
                    other
                )))
            }
        };
        let plane = height * width;
        let mut pixels = Vec::with_capacity(self.data.len());
        for i in 0..plane {
            for c in 0..channels {
                pixels.push(to_byte(self.data[c * plane + i]));
            }
        }

        let w = dimension(width)?;
        let h = dimension(height)?;
        let image = match channels {
            1 => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8),
            c => {
                return Err(KitError::Tensor(format!(
                    "unsupported channel count {}",
                    c
                )))
            }
        };
        image.ok_or_else(|| KitError::Tensor("image buffer has invalid capacity".into()))
    }
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0) as u8
}

fn dimension(n: usize) -> Result<u32> {
    u32::try_from(n)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| KitError::Tensor(format!("invalid image dimension {}", n)))
}

/// An image handed to the media store, either already decoded or as raw pixels.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bitmap(DynamicImage),
    Tensor(PixelTensor),
}

impl ImageSource {
    /// Brings the input into bitmap form, normalizing tensors on the way.
    pub fn into_bitmap(self) -> Result<DynamicImage> {
        match self {
            ImageSource::Bitmap(image) => Ok(image),
            ImageSource::Tensor(tensor) => tensor
                .to_host()
                .squeeze_batch()
                .clamp(0.0, 1.0)
                .into_bitmap(),
        }
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Bitmap(image)
    }
}

impl From<PixelTensor> for ImageSource {
    fn from(tensor: PixelTensor) -> Self {
        ImageSource::Tensor(tensor)
    }
}

/// Hook for freeing cached device memory once an image has been written out.
pub trait AcceleratorCache: Send + Sync {
    fn release(&self);
}

/// For processes with no accelerator: releasing is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostOnly;

impl AcceleratorCache for HostOnly {
    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_shape_must_match_data() {
        assert!(PixelTensor::new(vec![3, 2, 2], vec![0.0; 11]).is_err());
        assert!(PixelTensor::new(vec![], vec![]).is_err());
        assert!(PixelTensor::new(vec![3, 2, 2], vec![0.0; 12]).is_ok());
    }

    #[test]
    fn test_batched_rgb_tensor_normalizes() {
        // One pixel red, one pixel out of range on the high side, 2x1 image.
        let data = vec![
            1.0, 2.0, // R
            0.0, 0.5, // G
            -1.0, 0.25, // B
        ];
        let tensor = PixelTensor::new(vec![1, 3, 1, 2], data)
            .unwrap()
            .on_device(Device::Accelerator(0));
        let image = ImageSource::from(tensor).into_bitmap().unwrap();

        assert_eq!(image.dimensions(), (2, 1));
        let rgb = image.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 127, 63]);
    }

    #[test]
    fn test_grayscale_and_rgba_tensors() {
        let gray = PixelTensor::new(vec![2, 2], vec![0.0, 1.0, 0.5, 1.0]).unwrap();
        let image = ImageSource::from(gray).into_bitmap().unwrap();
        assert!(matches!(image, DynamicImage::ImageLuma8(_)));

        let rgba = PixelTensor::new(vec![4, 1, 1], vec![1.0, 1.0, 1.0, 0.0]).unwrap();
        let image = ImageSource::from(rgba).into_bitmap().unwrap();
        assert_eq!(image.to_rgba8().get_pixel(0, 0).0, [255, 255, 255, 0]);
    }

    #[test]
    fn test_unsupported_layouts_error() {
        let two_channel = PixelTensor::new(vec![2, 1, 1], vec![0.0, 0.0]).unwrap();
        assert!(ImageSource::from(two_channel).into_bitmap().is_err());

        let batch_of_two = PixelTensor::new(vec![2, 3, 1, 1], vec![0.0; 6]).unwrap();
        assert!(ImageSource::from(batch_of_two).into_bitmap().is_err());
    }

    #[test]
    fn test_to_host_clears_device() {
        let tensor = PixelTensor::new(vec![1, 1], vec![0.0])
            .unwrap()
            .on_device(Device::Accelerator(1));
        assert_eq!(tensor.device(), Device::Accelerator(1));
        assert_eq!(tensor.to_host().device(), Device::Host);
    }
}
