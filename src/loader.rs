use std::fs;
use std::path::Path;

use miette::Result;

use crate::error;

/// A machine code image: a load address followed by the words to store there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    origin: u16,
    words: Vec<u16>,
}

impl Image {
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Image { origin, words }
    }

    /// Read an image file of big-endian words, the first of which is the origin.
    pub fn read(path: &Path) -> Result<Image> {
        let buffer = fs::read(path).map_err(|e| error::load_unreadable(path, e))?;
        Self::from_bytes(path, &buffer)
    }

    /// Parse raw image bytes. `path` is only used for error messages.
    pub fn from_bytes(path: &Path, buffer: &[u8]) -> Result<Image> {
        if buffer.len() % 2 != 0 {
            return Err(error::load_odd_length(path, buffer.len()));
        }

        let mut words = buffer
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]));
        let Some(origin) = words.next() else {
            return Err(error::load_missing_origin(path));
        };

        Ok(Image {
            origin,
            words: words.collect(),
        })
    }

    pub fn origin(&self) -> u16 {
        self.origin
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Big-endian encoding of this image, as [`Image::read`] expects it.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }
}
