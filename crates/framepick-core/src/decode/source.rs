//! Image sources and the providers that open them.
//!
//! An [`ImageSource`] is an opaque handle plus the origin of the pick. The
//! [`ImageProvider`] turns a handle into a readable stream and, for gallery
//! picks, answers orientation queries from its content index.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Seek};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Where a picked image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Captured by the camera; orientation comes from embedded EXIF.
    #[default]
    Camera,
    /// Selected from the gallery; orientation comes from the content index.
    Gallery,
}

/// Handle to pixel data plus its origin tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageSource {
    handle: String,
    origin: Origin,
}

impl ImageSource {
    pub fn new(handle: impl Into<String>, origin: Origin) -> Self {
        Self {
            handle: handle.into(),
            origin,
        }
    }

    pub fn camera(handle: impl Into<String>) -> Self {
        Self::new(handle, Origin::Camera)
    }

    pub fn gallery(handle: impl Into<String>) -> Self {
        Self::new(handle, Origin::Gallery)
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// A buffered, seekable byte stream.
pub trait ReadSeek: BufRead + Seek + Send {}

impl<T: BufRead + Seek + Send> ReadSeek for T {}

/// Opens image handles and answers content-index queries.
pub trait ImageProvider: Send + Sync {
    /// Open a fresh read stream for `handle`.
    fn open(&self, handle: &str) -> io::Result<Box<dyn ReadSeek>>;

    /// Orientation attribute recorded by the content index, in degrees.
    fn orientation_attribute(&self, _handle: &str) -> Option<i32> {
        None
    }
}

impl<P: ImageProvider + ?Sized> ImageProvider for Arc<P> {
    fn open(&self, handle: &str) -> io::Result<Box<dyn ReadSeek>> {
        (**self).open(handle)
    }

    fn orientation_attribute(&self, handle: &str) -> Option<i32> {
        (**self).orientation_attribute(handle)
    }
}

/// Treats handles as filesystem paths. A `file://` prefix is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProvider;

impl FileProvider {
    pub fn new() -> Self {
        Self
    }

    fn resolve(&self, handle: &str) -> PathBuf {
        PathBuf::from(handle.strip_prefix("file://").unwrap_or(handle))
    }
}

impl ImageProvider for FileProvider {
    fn open(&self, handle: &str) -> io::Result<Box<dyn ReadSeek>> {
        let file = File::open(self.resolve(handle))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// In-memory provider keyed by handle.
///
/// Also acts as a content index: orientation attributes can be attached to
/// individual handles.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    images: HashMap<String, Arc<[u8]>>,
    orientations: HashMap<String, i32>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.images
            .insert(handle.into(), Arc::from(bytes.into().into_boxed_slice()));
    }

    pub fn set_orientation(&mut self, handle: impl Into<String>, degrees: i32) {
        self.orientations.insert(handle.into(), degrees);
    }

    pub fn with_image(mut self, handle: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(handle, bytes);
        self
    }

    pub fn with_orientation(mut self, handle: impl Into<String>, degrees: i32) -> Self {
        self.set_orientation(handle, degrees);
        self
    }
}

/// Shared byte slice usable as a `Cursor` backing store.
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl ImageProvider for MemoryProvider {
    fn open(&self, handle: &str) -> io::Result<Box<dyn ReadSeek>> {
        let bytes = self.images.get(handle).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no image for {handle}"))
        })?;
        Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(bytes)))))
    }

    fn orientation_attribute(&self, handle: &str) -> Option<i32> {
        self.orientations.get(handle).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_source_accessors() {
        let source = ImageSource::gallery("content://media/42");
        assert_eq!(source.handle(), "content://media/42");
        assert_eq!(source.origin(), Origin::Gallery);
        assert_eq!(ImageSource::camera("a.jpg").origin(), Origin::Camera);
    }

    #[test]
    fn test_sources_are_hashable() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        assert!(seen.insert(ImageSource::camera("a.jpg")));
        assert!(seen.insert(ImageSource::gallery("a.jpg")));
        assert!(!seen.insert(ImageSource::camera("a.jpg")));
    }

    #[test]
    fn test_memory_provider_open() {
        let provider = MemoryProvider::new().with_image("a", vec![1u8, 2, 3]);
        let mut stream = provider.open("a").unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_memory_provider_missing_handle() {
        let provider = MemoryProvider::new();
        let err = provider.open("missing").err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_provider_orientation_attribute() {
        let provider = MemoryProvider::new()
            .with_image("a", vec![0u8])
            .with_orientation("a", 270);
        assert_eq!(provider.orientation_attribute("a"), Some(270));
        assert_eq!(provider.orientation_attribute("b"), None);
    }

    #[test]
    fn test_file_provider_strips_scheme() {
        let provider = FileProvider::new();
        assert_eq!(provider.resolve("file:///tmp/x.jpg"), PathBuf::from("/tmp/x.jpg"));
        assert_eq!(provider.resolve("x.jpg"), PathBuf::from("x.jpg"));
    }

    #[test]
    fn test_file_provider_missing_file() {
        let provider = FileProvider::new();
        assert!(provider.open("/definitely/not/here.jpg").is_err());
        assert_eq!(provider.orientation_attribute("/anything"), None);
    }
}
