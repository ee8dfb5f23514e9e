//! Multi-file dataset layout and flat image index resolution.
//!
//! The filewriter splits an image series across `data_000001`,
//! `data_000002`, ... links in `/entry/data`, each holding a fixed number of
//! frames. A flat image index is mapped onto one of those blocks and a frame
//! offset inside it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Prefix of data block names.
pub const DATA_BLOCK_PREFIX: &str = "data_";

/// Number of decimal digits following [`DATA_BLOCK_PREFIX`].
pub const DATA_BLOCK_DIGITS: usize = 6;

/// Returns true if `key` is `data_` followed by exactly six ASCII digits.
#[must_use]
pub fn is_data_block_key(key: &str) -> bool {
    key.strip_prefix(DATA_BLOCK_PREFIX).is_some_and(|digits| {
        digits.len() == DATA_BLOCK_DIGITS && digits.bytes().all(|b| b.is_ascii_digit())
    })
}

/// How a flat index walks frames across blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrder {
    /// Fill each block before advancing to the next:
    /// block = `index / F`, frame = `index % F`.
    #[default]
    Sequential,
    /// Row-major unravel over `[F, N]`:
    /// frame = `index / N`, block = `index % N`.
    Interleaved,
}

/// Position of one image within the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLocation {
    /// Index into [`DatasetLayout::block_keys`].
    pub block: usize,
    /// Frame offset within the block.
    pub frame: usize,
}

/// Data blocks composing one logical image series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    block_keys: Vec<String>,
    frames_per_block: usize,
    order: FrameOrder,
}

impl DatasetLayout {
    /// Builds a layout from the member names of a data group.
    ///
    /// Names not matching `data_######` are ignored; the rest are sorted,
    /// which is numeric order for zero-padded fixed-width names.
    /// `frames_of` is asked for the leading-axis extent of the first block
    /// only.
    ///
    /// # Errors
    /// Returns [`Error::NoDataBlocks`] if no name matches, or the error
    /// produced by `frames_of`.
    pub fn from_keys<I, S, F, E>(
        keys: I,
        order: FrameOrder,
        frames_of: F,
    ) -> std::result::Result<Self, E>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&str) -> std::result::Result<usize, E>,
        E: From<Error>,
    {
        let mut block_keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|key| is_data_block_key(key))
            .collect();
        block_keys.sort();

        let first = block_keys.first().ok_or(Error::NoDataBlocks)?;
        let frames_per_block = frames_of(first)?;

        Ok(Self {
            block_keys,
            frames_per_block,
            order,
        })
    }

    /// Builds a layout from already-validated parts.
    ///
    /// # Errors
    /// Returns [`Error::NoDataBlocks`] if `block_keys` is empty.
    pub fn new(
        block_keys: Vec<String>,
        frames_per_block: usize,
        order: FrameOrder,
    ) -> Result<Self> {
        if block_keys.is_empty() {
            return Err(Error::NoDataBlocks);
        }
        Ok(Self {
            block_keys,
            frames_per_block,
            order,
        })
    }

    /// Sorted block names.
    #[must_use]
    pub fn block_keys(&self) -> &[String] {
        &self.block_keys
    }

    /// Frames per block (F).
    #[must_use]
    pub fn frames_per_block(&self) -> usize {
        self.frames_per_block
    }

    /// Number of blocks (N).
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_keys.len()
    }

    /// Index traversal order.
    #[must_use]
    pub fn order(&self) -> FrameOrder {
        self.order
    }

    /// Total addressable images (F × N).
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.frames_per_block.saturating_mul(self.block_keys.len())
    }

    /// Maps a flat image index to a block and in-block frame.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] if `index >= F × N`.
    pub fn locate(&self, index: usize) -> Result<FrameLocation> {
        let len = self.image_count();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }

        let location = match self.order {
            FrameOrder::Sequential => FrameLocation {
                block: index / self.frames_per_block,
                frame: index % self.frames_per_block,
            },
            FrameOrder::Interleaved => FrameLocation {
                block: index % self.block_count(),
                frame: index / self.block_count(),
            },
        };
        log::debug!(
            "image {index} -> {} frame {}",
            self.block_keys[location.block],
            location.frame
        );
        Ok(location)
    }

    /// Block name for a resolved location.
    #[must_use]
    pub fn block_key(&self, location: FrameLocation) -> &str {
        &self.block_keys[location.block]
    }
}
