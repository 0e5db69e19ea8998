//! Digit image datasets, batching, and PNG output.
//!
//! ## CSV Format
//!
//! One image per line, label first, then the pixels row-major:
//! ```text
//! label,p0,p1,...,p783
//! ```
//! Pixels are 0-255 grayscale and are normalized to \[0, 1\] on load.
//! A leading header line (any line whose first field is not a number) is
//! skipped.

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::{NetError, NetResult};

/// Digit image height in pixels.
pub const DIGIT_HEIGHT: usize = 28;
/// Digit image width in pixels.
pub const DIGIT_WIDTH: usize = 28;
/// Total pixels per digit image (28 × 28 = 784).
pub const DIGIT_PIXELS: usize = DIGIT_HEIGHT * DIGIT_WIDTH;
/// Number of digit classes.
pub const NUM_DIGIT_CLASSES: usize = 10;

/// A loaded image dataset with normalized pixel values and labels.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    /// Pixel data normalized to \[0, 1\], shape: (num_images, pixels_per_image).
    pub images: Array2<f32>,
    /// Class labels (0-9 for digits).
    pub labels: Vec<u8>,
    /// Number of classes used for one-hot targets.
    pub num_classes: usize,
}

/// One mini-batch of images.
#[derive(Debug, Clone)]
pub struct ImageBatch {
    /// Shape (batch, pixels).
    pub images: Array2<f32>,
    pub labels: Vec<u8>,
    /// One-hot labels, shape (batch, num_classes).
    pub targets: Array2<f32>,
}

impl ImageDataset {
    /// Wrap in-memory data.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::ShapeMismatch`] if the label count differs from the
    /// image count or a label is not below `num_classes`.
    pub fn new(images: Array2<f32>, labels: Vec<u8>, num_classes: usize) -> NetResult<Self> {
        if images.nrows() != labels.len() {
            return Err(NetError::ShapeMismatch(format!(
                "{} images but {} labels",
                images.nrows(),
                labels.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| usize::from(l) >= num_classes) {
            return Err(NetError::ShapeMismatch(format!(
                "label {bad} outside {num_classes} classes"
            )));
        }
        Ok(Self {
            images,
            labels,
            num_classes,
        })
    }

    /// Load a labelled-pixel CSV file of `pixels_per_image` wide images.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the file cannot be read and
    /// [`NetError::Parse`] for malformed rows.
    pub fn load_csv(path: &Path, pixels_per_image: usize, num_classes: usize) -> NetResult<Self> {
        let io_err = |source| NetError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(path).map_err(io_err)?;
        let reader = BufReader::new(file);

        let mut pixels: Vec<f32> = Vec::new();
        let mut labels = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let first = fields.next().unwrap_or("").trim();
            let label: u8 = match first.parse() {
                Ok(l) => l,
                Err(_) if line_no == 0 => continue,
                Err(e) => {
                    return Err(NetError::Parse {
                        line: line_no + 1,
                        message: format!("bad label '{first}': {e}"),
                    })
                }
            };

            let start = pixels.len();
            for field in fields {
                let value: u8 = field.trim().parse().map_err(|e| NetError::Parse {
                    line: line_no + 1,
                    message: format!("bad pixel '{field}': {e}"),
                })?;
                pixels.push(f32::from(value) / 255.0);
            }
            let width = pixels.len() - start;
            if width != pixels_per_image {
                return Err(NetError::Parse {
                    line: line_no + 1,
                    message: format!("expected {pixels_per_image} pixels, found {width}"),
                });
            }
            labels.push(label);
        }

        let images = Array2::from_shape_vec((labels.len(), pixels_per_image), pixels)
            .map_err(|e| NetError::ShapeMismatch(e.to_string()))?;
        let dataset = Self::new(images, labels, num_classes)?;
        tracing::info!(
            path = %path.display(),
            images = dataset.len(),
            "loaded image dataset"
        );
        Ok(dataset)
    }

    /// Load 28×28 digit images with 10 classes.
    ///
    /// # Errors
    ///
    /// See [`load_csv`](Self::load_csv).
    pub fn load_digits_csv(path: &Path) -> NetResult<Self> {
        Self::load_csv(path, DIGIT_PIXELS, NUM_DIGIT_CLASSES)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn image_dim(&self) -> usize {
        self.images.ncols()
    }

    /// Gather the given rows into a batch.
    #[must_use]
    pub fn batch(&self, indices: &[usize]) -> ImageBatch {
        let images = self.images.select(ndarray::Axis(0), indices);
        let labels: Vec<u8> = indices.iter().map(|&i| self.labels[i]).collect();
        let targets = one_hot_encode(&labels, self.num_classes);
        ImageBatch {
            images,
            labels,
            targets,
        }
    }

    /// Split into batches in dataset order; the last batch may be short.
    #[must_use]
    pub fn batches(&self, batch_size: usize) -> Vec<ImageBatch> {
        let indices: Vec<usize> = (0..self.len()).collect();
        indices
            .chunks(batch_size.max(1))
            .map(|chunk| self.batch(chunk))
            .collect()
    }

    /// Split into batches after shuffling the sample order.
    pub fn shuffled_batches<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Vec<ImageBatch> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        indices
            .chunks(batch_size.max(1))
            .map(|chunk| self.batch(chunk))
            .collect()
    }
}

/// One-hot encode class labels.
///
/// Returns a matrix of shape (num_labels, num_classes).
#[must_use]
pub fn one_hot_encode(labels: &[u8], num_classes: usize) -> Array2<f32> {
    let mut encoded = Array2::zeros((labels.len(), num_classes));
    for (i, &label) in labels.iter().enumerate() {
        encoded[[i, usize::from(label)]] = 1.0;
    }
    encoded
}

/// Mean squared error between two image vectors.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reconstruction_mse(original: &Array1<f32>, reconstructed: &Array1<f32>) -> f32 {
    let diff = original - reconstructed;
    diff.dot(&diff) / diff.len() as f32
}

/// Write a row-major grayscale image with values in \[0, 1\] as a PNG.
///
/// Values outside the range are clamped.
///
/// # Errors
///
/// Returns [`NetError::ShapeMismatch`] if `pixels` does not hold
/// `width * height` values and [`NetError::Image`] if encoding or writing fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn save_png(path: &Path, pixels: ArrayView1<f32>, width: usize, height: usize) -> NetResult<()> {
    if pixels.len() != width * height {
        return Err(NetError::ShapeMismatch(format!(
            "{} pixels for a {width}x{height} image",
            pixels.len()
        )));
    }
    let bytes: Vec<u8> = pixels
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let img = ::image::GrayImage::from_raw(width as u32, height as u32, bytes)
        .ok_or_else(|| NetError::Image(format!("cannot build {width}x{height} image")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| NetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    img.save_with_format(path, ::image::ImageFormat::Png)
        .map_err(|e| NetError::Image(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::fs;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("nnplay_test_images");
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(name);
        fs::write(&path, content).expect("write csv");
        path
    }

    #[test]
    fn test_load_csv_with_header() {
        let path = write_temp("header.csv", "label,p0,p1,p2,p3\n1,0,255,0,255\n0,255,255,255,255\n");
        let ds = ImageDataset::load_csv(&path, 4, 2).expect("load csv");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labels, vec![1, 0]);
        assert_eq!(ds.images[[0, 1]], 1.0);
        assert_eq!(ds.images[[0, 0]], 0.0);
        assert_eq!(ds.images.row(1).sum(), 4.0);
    }

    #[test]
    fn test_load_csv_wrong_width() {
        let path = write_temp("short.csv", "1,0,255\n");
        let result = ImageDataset::load_csv(&path, 4, 2);
        assert!(matches!(result, Err(NetError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_label_out_of_range() {
        let images = Array2::zeros((1, 4));
        assert!(ImageDataset::new(images, vec![3], 2).is_err());
    }

    #[test]
    fn test_batches_cover_dataset() {
        let images = Array2::from_shape_fn((5, 2), |(i, _)| i as f32);
        let ds = ImageDataset::new(images, vec![0, 1, 2, 3, 4], 5).expect("dataset");
        let batches = ds.batches(2);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].images.nrows(), 1);
        assert_eq!(batches[1].targets[[0, 2]], 1.0);

        let mut rng = rand::rngs::StdRng::seed_from_u64(12345);
        let mut seen: Vec<u8> = ds
            .shuffled_batches(2, &mut rng)
            .into_iter()
            .flat_map(|b| b.labels)
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_one_hot_encode() {
        let encoded = one_hot_encode(&[0, 3, 1], 4);
        assert_eq!(encoded.shape(), &[3, 4]);
        assert_eq!(encoded[[0, 0]], 1.0);
        assert_eq!(encoded[[1, 3]], 1.0);
        assert_eq!(encoded[[2, 1]], 1.0);
        assert_eq!(encoded.sum(), 3.0);
    }

    #[test]
    fn test_reconstruction_mse() {
        let a = Array1::from_vec(vec![0.0, 1.0, 0.5]);
        assert_eq!(reconstruction_mse(&a, &a), 0.0);
        let c = Array1::from_vec(vec![1.0, 0.0, 0.0]);
        assert!(reconstruction_mse(&a, &c) > 0.0);
    }

    #[test]
    fn test_save_png() {
        let dir = std::env::temp_dir().join("nnplay_test_png");
        let path = dir.join("Output_0.png");
        let pixels = Array1::from_shape_fn(DIGIT_PIXELS, |i| (i % 2) as f32);
        save_png(&path, pixels.view(), DIGIT_WIDTH, DIGIT_HEIGHT).expect("save png");

        let img = ::image::open(&path).expect("read png back").to_luma8();
        assert_eq!(img.dimensions(), (28, 28));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_png_wrong_size() {
        let pixels = Array1::zeros(10);
        let result = save_png(Path::new("/tmp/never.png"), pixels.view(), 28, 28);
        assert!(matches!(result, Err(NetError::ShapeMismatch(_))));
    }
}
