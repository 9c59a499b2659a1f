//! # Frame Sources
//!
//! Decoded raster frames, aligned 1:1 by index with the detection history.
//! Only the team classifier reads pixels, and only for the bootstrap window
//! plus frames where an unseen track id shows up, so directory-backed
//! sources decode lazily.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{info, warn};

use crate::error::Result;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Random access to decoded RGB frames
pub trait FrameSource: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame `index`, or `None` if it is out of range or cannot be decoded.
    fn frame(&self, index: usize) -> Option<Cow<'_, RgbImage>>;
}

/// Frames already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrames {
    frames: Vec<RgbImage>,
}

impl InMemoryFrames {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self { frames }
    }
}

impl FrameSource for InMemoryFrames {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Option<Cow<'_, RgbImage>> {
        self.frames.get(index).map(Cow::Borrowed)
    }
}

/// Image files of one directory, in lexicographic file-name order
#[derive(Debug, Clone)]
pub struct ImageDirFrames {
    paths: Vec<PathBuf>,
    dimensions: Option<(u32, u32)>,
}

impl ImageDirFrames {
    /// List the directory's frames. The first frame's header is read so an
    /// unreadable directory of images fails here rather than mid-run.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        let dimensions = match paths.first() {
            Some(first) => Some(image::image_dimensions(first)?),
            None => None,
        };
        info!(
            dir = %dir.display(),
            frames = paths.len(),
            ?dimensions,
            "opened frame directory"
        );
        Ok(Self { paths, dimensions })
    }

    /// Width and height of the first frame
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ImageDirFrames {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn frame(&self, index: usize) -> Option<Cow<'_, RgbImage>> {
        let path = self.paths.get(index)?;
        match image::open(path) {
            Ok(img) => Some(Cow::Owned(img.to_rgb8())),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to decode frame");
                None
            }
        }
    }
}
