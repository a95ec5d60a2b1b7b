//! Orientation resolution.
//!
//! Two strategies, chosen by the source's [`Origin`]:
//! - **Gallery**: ask the provider's content index for an orientation
//!   attribute in degrees
//! - **Camera**: read the EXIF Orientation tag from the image's metadata block
//!
//! Neither strategy fails the pipeline. Missing, unreadable, mirrored or
//! ambiguous values resolve to [`Rotation::Deg0`].

use std::io::{BufRead, Seek};

use exif::{In, Reader, Tag};
use serde::{Deserialize, Serialize};

use super::source::{ImageProvider, ImageSource, Origin};
use super::Orientation;

/// Clockwise quarter-turn rotation, normalized modulo 360.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize `degrees` into one of the four quarter turns.
    ///
    /// Returns `None` for values that are not a multiple of 90.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Sum of two rotations, modulo 360.
    pub fn plus(self, other: Rotation) -> Rotation {
        Rotation::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    /// One more clockwise quarter turn.
    pub fn next(self) -> Rotation {
        self.plus(Rotation::Deg90)
    }

    /// True for 90 and 270, which exchange the image axes.
    #[inline]
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Exact (cos, sin) of the rotation angle.
    pub(crate) fn cos_sin(self) -> (f64, f64) {
        match self {
            Rotation::Deg0 => (1.0, 0.0),
            Rotation::Deg90 => (0.0, 1.0),
            Rotation::Deg180 => (-1.0, 0.0),
            Rotation::Deg270 => (0.0, -1.0),
        }
    }

    fn quarter_turns(self) -> u8 {
        (self.degrees() / 90) as u8
    }

    fn from_quarter_turns(turns: u8) -> Rotation {
        match turns % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(value)
            .ok_or_else(|| format!("rotation must be a multiple of 90, got {value}"))
    }
}

impl From<Rotation> for i32 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// Resolve the intrinsic orientation of `source`.
pub fn resolve_orientation(provider: &dyn ImageProvider, source: &ImageSource) -> Rotation {
    match source.origin() {
        Origin::Gallery => gallery_orientation(provider, source),
        Origin::Camera => camera_orientation(provider, source),
    }
}

/// Combined rotation handed to the transform builder.
pub fn combined_rotation(
    provider: &dyn ImageProvider,
    source: &ImageSource,
    offset: Rotation,
) -> Rotation {
    let intrinsic = resolve_orientation(provider, source);
    let combined = intrinsic.plus(offset);
    log::debug!(
        "orientation {}: intrinsic {} + offset {} = {}",
        source.handle(),
        intrinsic.degrees(),
        offset.degrees(),
        combined.degrees()
    );
    combined
}

fn gallery_orientation(provider: &dyn ImageProvider, source: &ImageSource) -> Rotation {
    match provider.orientation_attribute(source.handle()) {
        Some(degrees) => Rotation::from_degrees(degrees).unwrap_or_else(|| {
            log::warn!(
                "ambiguous orientation attribute {} for {}, using 0",
                degrees,
                source.handle()
            );
            Rotation::Deg0
        }),
        None => {
            log::debug!("no orientation attribute for {}", source.handle());
            Rotation::Deg0
        }
    }
}

fn camera_orientation(provider: &dyn ImageProvider, source: &ImageSource) -> Rotation {
    let mut stream = match provider.open(source.handle()) {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("cannot read metadata of {}: {}, using 0", source.handle(), e);
            return Rotation::Deg0;
        }
    };

    let orientation = read_exif_orientation(&mut stream).unwrap_or_default();
    if orientation.is_mirrored() {
        log::warn!(
            "mirrored EXIF orientation {:?} on {} is unsupported, using 0",
            orientation,
            source.handle()
        );
    }
    orientation.rotation()
}

/// Read the EXIF Orientation tag from an image container.
///
/// Returns `None` if no EXIF data is found or the tag is absent.
pub fn read_exif_orientation<R: BufRead + Seek>(reader: &mut R) -> Option<Orientation> {
    let exif = Reader::new().read_from_container(reader).ok()?;
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;
    field.value.get_uint(0).map(Orientation::from)
}
