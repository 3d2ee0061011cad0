//! Element texture atlas - one slot per element, stacked vertically.
//!
//! Slot `i` holds the texture of the element with ordinal `i + 1` (the empty
//! type has no texture). Shaders get that offset as `ATLAS_SLOT_OFFSET`; see
//! [`crate::build::shader::ATLAS_SLOT_OFFSET`]. The slot list is padded with
//! the fallback texture up to a power of two because the sampler derives slot
//! offsets with power-of-two arithmetic.

use crate::build::manifest::{ElementDefinition, ElementManifest};
use image::{imageops, Rgba, RgbaImage};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Transparent color for atlas background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Error building the atlas.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// A slot image could not be opened or decoded
    #[error("Failed to load texture {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The composite could not be written
    #[error("Failed to write atlas {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Output directory could not be created
    #[error("Failed to create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The background writer panicked
    #[error("Atlas writer panicked")]
    WorkerPanicked,
}

/// One slot of the atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasSlot {
    /// Position of the slot in the atlas
    pub index: usize,
    /// Ordinal of the element drawn here; `None` for padding slots
    pub ordinal: Option<u32>,
    /// Image placed in the slot
    pub image_path: PathBuf,
}

impl AtlasSlot {
    /// Whether this slot uses the given fallback image.
    pub fn is_fallback(&self, fallback: &Path) -> bool {
        self.image_path == fallback
    }
}

/// Summary of a written atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasSummary {
    /// Where the atlas was written
    pub path: PathBuf,
    /// Number of slots including padding
    pub slots: usize,
    /// Composite width in pixels
    pub width: u32,
    /// Composite height in pixels
    pub height: u32,
}

/// Number of atlas slots for `element_count` elements.
///
/// Smallest power of two that is at least `element_count`. This is not the
/// shader's `ATLAS_HEIGHT`; see [`crate::build::shader::atlas_height`].
pub fn padded_slot_count(element_count: usize) -> usize {
    element_count.next_power_of_two()
}

/// Conventional texture path of an element: `<textures_dir>/<name>.png`.
pub fn texture_path(textures_dir: &Path, element: &ElementDefinition) -> PathBuf {
    textures_dir.join(format!("{}.png", element.name))
}

/// Plan the atlas slots for a manifest.
///
/// Elements without a texture of their own, and all padding slots, use
/// `fallback`.
pub fn plan_slots(manifest: &ElementManifest, textures_dir: &Path, fallback: &Path) -> Vec<AtlasSlot> {
    let mut slots: Vec<AtlasSlot> = manifest
        .iter()
        .map(|element| {
            let own = texture_path(textures_dir, element);
            let image_path = if own.is_file() {
                own
            } else {
                log::debug!("no texture for '{}', using fallback", element.name);
                fallback.to_path_buf()
            };
            AtlasSlot { index: element.index(), ordinal: Some(element.ordinal), image_path }
        })
        .collect();

    let total = padded_slot_count(slots.len());
    while slots.len() < total {
        slots.push(AtlasSlot { index: slots.len(), ordinal: None, image_path: fallback.to_path_buf() });
    }
    slots
}

/// Stack images top to bottom into one composite.
///
/// Inputs are expected to share one size; the composite is as wide as the
/// widest input.
pub fn compose_atlas(images: &[&RgbaImage]) -> RgbaImage {
    let width = images.iter().map(|i| i.width()).max().unwrap_or(0);
    let height = images.iter().map(|i| i.height()).sum();
    let mut atlas = RgbaImage::from_pixel(width, height, TRANSPARENT);

    let mut y: i64 = 0;
    for image in images {
        imageops::replace(&mut atlas, *image, 0, y);
        y += i64::from(image.height());
    }
    atlas
}

/// Load every slot image, compose them and write the atlas to `output`.
///
/// Each distinct image path is decoded once.
pub fn write_atlas(slots: &[AtlasSlot], output: &Path) -> Result<AtlasSummary, AtlasError> {
    let mut decoded: HashMap<&Path, RgbaImage> = HashMap::new();
    for slot in slots {
        if !decoded.contains_key(slot.image_path.as_path()) {
            let image = image::open(&slot.image_path)
                .map_err(|source| AtlasError::Load { path: slot.image_path.clone(), source })?
                .to_rgba8();
            decoded.insert(slot.image_path.as_path(), image);
        }
    }

    let images: Vec<&RgbaImage> = slots.iter().map(|s| &decoded[s.image_path.as_path()]).collect();
    let atlas = compose_atlas(&images);

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| AtlasError::Io { path: parent.to_path_buf(), source })?;
    }
    atlas
        .save(output)
        .map_err(|source| AtlasError::Save { path: output.to_path_buf(), source })?;

    Ok(AtlasSummary {
        path: output.to_path_buf(),
        slots: slots.len(),
        width: atlas.width(),
        height: atlas.height(),
    })
}

/// An atlas being written on a background thread.
///
/// The atlas file must not be relied on until [`AtlasJob::wait`] returns.
#[derive(Debug)]
pub struct AtlasJob {
    handle: JoinHandle<Result<AtlasSummary, AtlasError>>,
}

impl AtlasJob {
    /// Start writing the atlas in the background.
    pub fn spawn(slots: Vec<AtlasSlot>, output: PathBuf) -> Self {
        let handle = thread::spawn(move || write_atlas(&slots, &output));
        Self { handle }
    }

    /// Block until the atlas is written.
    pub fn wait(self) -> Result<AtlasSummary, AtlasError> {
        self.handle.join().map_err(|_| AtlasError::WorkerPanicked)?
    }
}
