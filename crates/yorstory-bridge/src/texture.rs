#![forbid(unsafe_code)]

//! Streamed texture loading.
//!
//! A texture load is a small conversation with the server:
//!
//! 1. `GET {metadata}?path=..&chunkSizeMax=..` answers `{width, height, chunkSize}`.
//! 2. `chunkSize == 0`: the whole image is fetched and uploaded at once.
//! 3. `chunkSize > 0`: `ceil(width * height / chunkSize)` row-aligned bands are
//!    fetched from `{chunk}?path=..&index=..`, decoded independently, and
//!    queued as [`TextureLoadJob`]s that the frame loop uploads one per tick.
//!
//! Chunks arrive in any order. Every job of a texture shares one
//! [`ChunkProgress`]; whichever job sets the last bit reports the texture
//! ready, so the guest is told exactly once.
//!
//! This module only does the bookkeeping; GL uploads happen in
//! [`Bridge`](crate::bridge::Bridge).

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use serde::Deserialize;

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Response of the metadata endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureMetadata {
    pub width: u32,
    pub height: u32,
    /// Pixels per chunk; 0 selects a single direct fetch.
    #[serde(default)]
    pub chunk_size: u32,
}

impl TextureMetadata {
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json).map_err(|e| BridgeError::Metadata(e.to_string()))
    }
}

/// How a texture's pixels will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPlan {
    /// One image covering the whole texture.
    Direct,
    /// `chunk_count` bands of `rows_per_chunk` rows, uploaded bottom-up.
    Chunked { chunk_count: u32, rows_per_chunk: u32 },
}

/// Largest width or height accepted from the metadata endpoint.
pub const MAX_TEXTURE_DIMENSION: u32 = 32_768;

/// Decide the load mode for `meta`.
///
/// A chunk size that does not cover whole rows is a server misconfiguration;
/// the load cannot proceed. Neither can one whose chunks are larger than the
/// `chunk_size_max` that was requested, or whose dimensions exceed
/// [`MAX_TEXTURE_DIMENSION`], which also caps the chunk count.
pub fn plan_load(meta: &TextureMetadata, chunk_size_max: u32) -> Result<LoadPlan, BridgeError> {
    if meta.width == 0 || meta.height == 0 {
        return Err(BridgeError::Metadata(format!(
            "empty image {}x{}",
            meta.width, meta.height
        )));
    }
    if meta.width > MAX_TEXTURE_DIMENSION || meta.height > MAX_TEXTURE_DIMENSION {
        return Err(BridgeError::Metadata(format!(
            "image {}x{} exceeds {MAX_TEXTURE_DIMENSION}",
            meta.width, meta.height
        )));
    }
    if meta.chunk_size == 0 {
        return Ok(LoadPlan::Direct);
    }
    if meta.chunk_size > chunk_size_max {
        return Err(BridgeError::Metadata(format!(
            "chunk size {} exceeds requested maximum {chunk_size_max}",
            meta.chunk_size
        )));
    }
    if meta.chunk_size % meta.width != 0 {
        return Err(BridgeError::ChunkMisaligned {
            chunk_size: meta.chunk_size,
            width: meta.width,
        });
    }
    // Whole rows per chunk, so there are at most `height` chunks.
    let rows_per_chunk = meta.chunk_size / meta.width;
    Ok(LoadPlan::Chunked {
        chunk_count: meta.height.div_ceil(rows_per_chunk),
        rows_per_chunk,
    })
}

/// Destination row of chunk `index`: chunks fill the texture from the bottom
/// up, matching the flipped image origin.
#[must_use]
pub fn chunk_destination_y(height: u32, rows_per_chunk: u32, index: u32, chunk_height: u32) -> i32 {
    let y = i64::from(height) - i64::from(rows_per_chunk) * i64::from(index) - i64::from(chunk_height);
    i32::try_from(y).unwrap_or(i32::MIN)
}

/// Result of recording one chunk as loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMark {
    /// Other chunks are still outstanding.
    Pending { remaining: u32 },
    /// This chunk was the last one; the texture is complete.
    Completed,
    /// The chunk had already been recorded (or is out of range).
    Ignored,
}

/// Per-texture "loaded" bitmap shared by all of that texture's jobs.
///
/// Shared through `Rc<RefCell<..>>`: sound only because every job runs on
/// the page's single event-loop thread.
#[derive(Debug, Clone)]
pub struct ChunkProgress {
    inner: Rc<RefCell<ChunkBitmap>>,
}

#[derive(Debug)]
struct ChunkBitmap {
    loaded: Vec<bool>,
    remaining: u32,
}

impl ChunkProgress {
    #[must_use]
    pub fn new(chunk_count: u32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChunkBitmap {
                loaded: vec![false; chunk_count as usize],
                remaining: chunk_count,
            })),
        }
    }

    /// Record chunk `index` as uploaded.
    pub fn mark(&self, index: u32) -> ChunkMark {
        let mut bitmap = self.inner.borrow_mut();
        match bitmap.loaded.get_mut(index as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => return ChunkMark::Ignored,
        }
        bitmap.remaining -= 1;
        match bitmap.remaining {
            0 => ChunkMark::Completed,
            remaining => ChunkMark::Pending { remaining },
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.inner.borrow().remaining == 0
    }
}

/// One decoded chunk waiting for upload.
#[derive(Debug)]
pub struct TextureLoadJob<I> {
    pub texture: u32,
    pub width: u32,
    pub height: u32,
    pub chunk_size: u32,
    pub index: u32,
    pub image: I,
    /// Rows in the decoded chunk (the last band may be short).
    pub image_height: u32,
    loaded: ChunkProgress,
}

impl<I> TextureLoadJob<I> {
    /// Row this chunk is uploaded at.
    #[must_use]
    pub fn destination_y(&self) -> i32 {
        let rows_per_chunk = self.chunk_size / self.width.max(1);
        chunk_destination_y(self.height, rows_per_chunk, self.index, self.image_height)
    }

    /// Mark this job's chunk as loaded in the shared bitmap.
    pub fn complete(&self) -> ChunkMark {
        self.loaded.mark(self.index)
    }
}

/// Notification for the guest's `onTextureLoaded(handle, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureReady {
    pub texture: u32,
    pub width: u32,
    pub height: u32,
}

/// A request for the host to fetch texture metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    pub texture: u32,
    pub url: String,
}

/// A request for the host to fetch and decode one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub texture: u32,
    pub url: String,
    /// `None` for a whole-image fetch.
    pub chunk: Option<u32>,
}

/// What the caller must do once metadata has been planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLoad {
    pub texture: u32,
    pub width: u32,
    pub height: u32,
    pub wrap: i32,
    pub filter: i32,
    pub fetches: Vec<ImageRequest>,
}

/// What happened to a decoded image.
#[derive(Debug)]
pub enum ImageArrival<I> {
    /// A whole-image load: upload now at the origin, then report `ready`.
    Direct { image: I, ready: TextureReady },
    /// A legacy single-image load with no metadata round trip.
    Legacy { image: I, wrap: i32, ready: TextureReady },
    /// A chunk was queued for the frame loop.
    Queued { queued: usize },
}

#[derive(Debug)]
enum LoadState {
    AwaitingMetadata { path: String, wrap: i32, filter: i32 },
    AwaitingImage { meta: TextureMetadata },
    AwaitingChunks { meta: TextureMetadata, progress: ChunkProgress },
    AwaitingLegacyImage { wrap: i32 },
}

/// Tracks every texture load in flight and the queue of decoded chunks.
#[derive(Debug)]
pub struct TextureStreamer<I> {
    metadata_endpoint: String,
    chunk_endpoint: String,
    chunk_size_max: u32,
    in_flight: BTreeMap<u32, LoadState>,
    queue: VecDeque<TextureLoadJob<I>>,
}

impl<I> TextureStreamer<I> {
    #[must_use]
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            metadata_endpoint: config.metadata_endpoint.clone(),
            chunk_endpoint: config.chunk_endpoint.clone(),
            chunk_size_max: config.chunk_size_max,
            in_flight: BTreeMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Start a metadata-driven load of `path` into `texture`.
    pub fn begin(&mut self, texture: u32, path: &str, wrap: i32, filter: i32) -> MetadataRequest {
        let url = with_query(
            &self.metadata_endpoint,
            &[("path", path), ("chunkSizeMax", &self.chunk_size_max.to_string())],
        );
        self.in_flight.insert(
            texture,
            LoadState::AwaitingMetadata {
                path: path.to_owned(),
                wrap,
                filter,
            },
        );
        MetadataRequest { texture, url }
    }

    /// Start a plain single-image load of `url` (no metadata endpoint).
    pub fn begin_legacy(&mut self, texture: u32, url: &str, wrap: i32) -> ImageRequest {
        self.in_flight
            .insert(texture, LoadState::AwaitingLegacyImage { wrap });
        ImageRequest {
            texture,
            url: url.to_owned(),
            chunk: None,
        }
    }

    /// Plan the image fetches for `texture` from its metadata.
    ///
    /// On error the load is abandoned; the texture keeps its placeholder.
    pub fn on_metadata(
        &mut self,
        texture: u32,
        meta: TextureMetadata,
    ) -> Result<PlannedLoad, BridgeError> {
        let Some(LoadState::AwaitingMetadata { path, wrap, filter }) =
            self.in_flight.remove(&texture)
        else {
            return Err(BridgeError::UnknownTexture(texture));
        };

        let plan = plan_load(&meta, self.chunk_size_max)?;
        let fetches = match plan {
            LoadPlan::Direct => {
                self.in_flight
                    .insert(texture, LoadState::AwaitingImage { meta });
                vec![ImageRequest {
                    texture,
                    url: path,
                    chunk: None,
                }]
            }
            LoadPlan::Chunked { chunk_count, .. } => {
                tracing::debug!(texture, chunk_count, chunk_size = meta.chunk_size, "chunked texture load");
                let fetches = (0..chunk_count)
                    .map(|index| ImageRequest {
                        texture,
                        url: with_query(
                            &self.chunk_endpoint,
                            &[("path", &path), ("index", &index.to_string())],
                        ),
                        chunk: Some(index),
                    })
                    .collect();
                self.in_flight.insert(
                    texture,
                    LoadState::AwaitingChunks {
                        meta,
                        progress: ChunkProgress::new(chunk_count),
                    },
                );
                fetches
            }
        };

        Ok(PlannedLoad {
            texture,
            width: meta.width,
            height: meta.height,
            wrap,
            filter,
            fetches,
        })
    }

    /// Accept a decoded image for `texture` (chunk `chunk`, or the whole image).
    pub fn on_image(
        &mut self,
        texture: u32,
        chunk: Option<u32>,
        image: I,
        image_width: u32,
        image_height: u32,
    ) -> Result<ImageArrival<I>, BridgeError> {
        match (self.in_flight.get(&texture), chunk) {
            (Some(LoadState::AwaitingImage { meta }), None) => {
                let ready = TextureReady {
                    texture,
                    width: meta.width,
                    height: meta.height,
                };
                self.in_flight.remove(&texture);
                Ok(ImageArrival::Direct { image, ready })
            }
            (Some(LoadState::AwaitingLegacyImage { wrap }), None) => {
                let wrap = *wrap;
                self.in_flight.remove(&texture);
                Ok(ImageArrival::Legacy {
                    image,
                    wrap,
                    ready: TextureReady {
                        texture,
                        width: image_width,
                        height: image_height,
                    },
                })
            }
            (Some(LoadState::AwaitingChunks { meta, progress }), Some(index)) => {
                self.queue.push_back(TextureLoadJob {
                    texture,
                    width: meta.width,
                    height: meta.height,
                    chunk_size: meta.chunk_size,
                    index,
                    image,
                    image_height,
                    loaded: progress.clone(),
                });
                Ok(ImageArrival::Queued {
                    queued: self.queue.len(),
                })
            }
            _ => Err(BridgeError::UnknownTexture(texture)),
        }
    }

    /// Give up on `texture` after a network or decode failure.
    ///
    /// Jobs already queued for it still drain but can never complete it.
    pub fn abandon(&mut self, texture: u32, reason: &str) {
        if self.in_flight.remove(&texture).is_some() {
            tracing::warn!(texture, reason, "texture load abandoned");
        }
    }

    /// Take the oldest decoded chunk, if any.
    pub fn pop_job(&mut self) -> Option<TextureLoadJob<I>> {
        self.queue.pop_front()
    }

    /// Forget a texture whose last chunk has been uploaded.
    pub fn finish(&mut self, texture: u32) {
        self.in_flight.remove(&texture);
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_loading(&self, texture: u32) -> bool {
        self.in_flight.contains_key(&texture)
    }
}

fn with_query(endpoint: &str, pairs: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{endpoint}?{query}")
}
