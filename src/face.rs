use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use image::GrayImage;

use crate::error::ValidationError;

const MIN_SIDE: u32 = 64;
const MIN_MEAN_LUMA: f32 = 20.0;
const MAX_MEAN_LUMA: f32 = 235.0;
const MIN_LUMA_STDDEV: f32 = 8.0;
const SIGNATURE_SIDE: u32 = 64;

/// Image checks and face comparison used by face login.
pub trait FaceVerifier {
    /// Reject captures that cannot be compared meaningfully.
    fn validate(&self, image: &Path) -> Result<(), ValidationError>;
    /// Whether `candidate` shows the same face as `reference`.
    fn compare(&self, reference: &Path, candidate: &Path) -> anyhow::Result<bool>;
}

/// Exposure-checking verifier that matches on the cosine similarity of
/// mean-centred 64x64 grayscale thumbnails. A placeholder for a real face
/// recognizer, not a biometric.
pub struct ThumbnailVerifier {
    threshold: f32,
}

impl ThumbnailVerifier {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn similarity(&self, reference: &Path, candidate: &Path) -> anyhow::Result<f32> {
        let a = signature(&load_luma(reference)?);
        let b = signature(&load_luma(candidate)?);
        Ok(cosine_similarity(&a, &b))
    }
}

impl FaceVerifier for ThumbnailVerifier {
    fn validate(&self, image: &Path) -> Result<(), ValidationError> {
        let luma = image::open(image)
            .map_err(|e| ValidationError::Unreadable(e.to_string()))?
            .to_luma8();
        let (width, height) = luma.dimensions();
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(ValidationError::TooSmall { width, height });
        }

        let (mean, stddev) = luma_stats(&luma);
        if mean < MIN_MEAN_LUMA {
            return Err(ValidationError::TooDark);
        }
        if mean > MAX_MEAN_LUMA {
            return Err(ValidationError::TooBright);
        }
        if stddev < MIN_LUMA_STDDEV {
            return Err(ValidationError::NoDetail);
        }
        Ok(())
    }

    fn compare(&self, reference: &Path, candidate: &Path) -> anyhow::Result<bool> {
        let similarity = self.similarity(reference, candidate)?;
        let matched = similarity >= self.threshold;
        tracing::info!(
            similarity,
            threshold = self.threshold,
            matched,
            "face comparison"
        );
        Ok(matched)
    }
}

fn load_luma(path: &Path) -> anyhow::Result<GrayImage> {
    Ok(image::open(path)
        .with_context(|| format!("cannot read {}", path.display()))?
        .to_luma8())
}

fn luma_stats(image: &GrayImage) -> (f32, f32) {
    let n = image.as_raw().len().max(1) as f32;
    let mean = image.as_raw().iter().map(|&v| v as f32).sum::<f32>() / n;
    let var = image
        .as_raw()
        .iter()
        .map(|&v| (v as f32 - mean).powi(2))
        .sum::<f32>()
        / n;
    (mean, var.sqrt())
}

fn signature(image: &GrayImage) -> Vec<f32> {
    let thumb = image::imageops::resize(image, SIGNATURE_SIDE, SIGNATURE_SIDE, FilterType::Triangle);
    let (mean, _) = luma_stats(&thumb);
    thumb.as_raw().iter().map(|&v| v as f32 - mean).collect()
}

/// Cosine similarity in [-1, 1]; 0 when either vector is flat.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}
