use std::{fmt, sync::Arc};

/// An entry of the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Item {
    pub(crate) id: usize,
}

impl Item {
    pub(crate) fn new(id: usize) -> Self {
        Self { id }
    }
}

/// What the list screen shows.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum DataState {
    Loading,
    Data(Vec<Item>),
}

/// A decoded image.
#[derive(Clone, PartialEq)]
pub(crate) struct Image {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Arc<[u8]>,
}

impl Image {
    /// The image shown when fetching the real one failed.
    pub(crate) fn fallback() -> Self {
        Self { width: 0, height: 0, pixels: Arc::from([]) }
    }

    pub(crate) fn is_fallback(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
