//! # Version Selection
//!
//! Maps a detected interpreter release and target word size to the
//! [`InterpreterVersion`] every layout lookup is keyed by.
//!
//! Version detection itself (reading `Py_GetVersion`, parsing the binary name,
//! and so on) is somebody else's job. This module only validates the tuple it
//! is handed and refuses anything the layout catalog cannot describe.
//!
//! ## Supported releases
//!
//! | Release | Family    | Pointer widths |
//! |---------|-----------|----------------|
//! | 2.4     | `Python2` | 4              |
//! | 2.5–2.7 | `Python2` | 4, 8           |
//! | 3.0–3.1 | `Python3` | 4, 8           |
//!
//! 2.4 predates `Py_ssize_t`; its 64-bit builds used `int` sized variable
//! headers and are rejected rather than guessed at.

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, Result};
use crate::layout::ObjectKind;

/// Every release the catalog has layouts for, oldest first.
pub const SUPPORTED_RELEASES: [Release; 6] = [
    Release::new(2, 4),
    Release::new(2, 5),
    Release::new(2, 6),
    Release::new(2, 7),
    Release::new(3, 0),
    Release::new(3, 1),
];

/// A `major.minor` interpreter release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Release
{
    /// Major version (2 or 3 for supported releases).
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl Release
{
    /// Create a release tag.
    pub const fn new(major: u8, minor: u8) -> Self
    {
        Self { major, minor }
    }

    /// Position of this release in [`SUPPORTED_RELEASES`], if supported.
    pub fn ordinal(self) -> Option<usize>
    {
        SUPPORTED_RELEASES.iter().position(|release| *release == self)
    }

    /// Returns `true` if the catalog knows this release.
    pub fn is_supported(self) -> bool
    {
        self.ordinal().is_some()
    }
}

impl fmt::Display for Release
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Release
{
    type Err = String;

    /// Parses `"2.7"` or `"2.7.18"`; the micro component is ignored.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|part| part.parse::<u8>().ok());
        let minor = parts.next().and_then(|part| part.parse::<u8>().ok());
        match (major, minor) {
            (Some(major), Some(minor)) => Ok(Release::new(major, minor)),
            _ => Err(format!("Invalid release: {s}. Use 'MAJOR.MINOR', e.g. '2.7'")),
        }
    }
}

/// Inclusive range of releases served by one layout entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange
{
    /// First release covered.
    pub first: Release,
    /// Last release covered.
    pub last: Release,
}

impl VersionRange
{
    /// A range covering `first..=last`.
    pub const fn new(first: Release, last: Release) -> Self
    {
        Self { first, last }
    }

    /// A range covering exactly one release.
    pub const fn single(release: Release) -> Self
    {
        Self {
            first: release,
            last: release,
        }
    }

    /// Returns `true` if `release` lies inside the range.
    pub fn contains(&self, release: Release) -> bool
    {
        self.first <= release && release <= self.last
    }

    /// Returns `true` if `release` is one of the range's endpoints.
    pub fn is_endpoint(&self, release: Release) -> bool
    {
        release == self.first || release == self.last
    }

    /// Number of supported releases in the range.
    ///
    /// Used to rank overlapping entries; narrower ranges win.
    pub fn span(&self) -> usize
    {
        SUPPORTED_RELEASES
            .iter()
            .filter(|release| self.contains(**release))
            .count()
    }
}

impl fmt::Display for VersionRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

/// Word size of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth
{
    /// 32-bit target.
    Four,
    /// 64-bit target.
    Eight,
}

impl PointerWidth
{
    /// Width in bytes.
    pub const fn bytes(self) -> usize
    {
        match self {
            PointerWidth::Four => 4,
            PointerWidth::Eight => 8,
        }
    }

    /// Parse a width in bytes.
    pub const fn from_bytes(bytes: usize) -> Option<Self>
    {
        match bytes {
            4 => Some(PointerWidth::Four),
            8 => Some(PointerWidth::Eight),
            _ => None,
        }
    }
}

/// C data model of the target build.
///
/// Only the size of C `long` and the `Py_UNICODE` unit depend on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataModel
{
    /// Unix: `long` is pointer sized, `Py_UNICODE` is UCS-4.
    #[default]
    Lp64,
    /// Windows: `long` is always 4 bytes, `Py_UNICODE` is UTF-16.
    Llp64,
}

impl DataModel
{
    /// Size of C `long` for the given pointer width.
    pub const fn long_size(self, width: PointerWidth) -> usize
    {
        match self {
            DataModel::Lp64 => width.bytes(),
            DataModel::Llp64 => 4,
        }
    }

    /// Size of one `Py_UNICODE` unit.
    pub const fn unicode_unit_size(self) -> usize
    {
        match self {
            DataModel::Lp64 => 4,
            DataModel::Llp64 => 2,
        }
    }
}

impl FromStr for DataModel
{
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "lp64" | "unix" | "linux" | "macos" => Ok(DataModel::Lp64),
            "llp64" | "windows" | "win" => Ok(DataModel::Llp64),
            _ => Err(format!("Unknown data model: {s}. Use 'lp64' or 'llp64'")),
        }
    }
}

/// Release-family bucket
///
/// Families group releases that share the shape of the code object and the
/// object type used for identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseFamily
{
    /// 2.4 through 2.7.
    Python2,
    /// 3.0 through 3.1.
    Python3,
}

impl ReleaseFamily
{
    /// Releases belonging to the family.
    pub const fn range(self) -> VersionRange
    {
        match self {
            ReleaseFamily::Python2 => VersionRange::new(Release::new(2, 4), Release::new(2, 7)),
            ReleaseFamily::Python3 => VersionRange::new(Release::new(3, 0), Release::new(3, 1)),
        }
    }
}

impl fmt::Display for ReleaseFamily
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} compatible", self.range())
    }
}

/// Shape of the code object a frame's `f_code` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeShape
{
    /// 2.x code object; names are byte strings.
    Classic,
    /// 3.x code object with `co_kwonlyargcount`; names are unicode.
    KeywordOnly,
}

/// Fully resolved interpreter version
///
/// Built once by [`select`] and threaded through every decoding step; no
/// component re-detects anything from target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterpreterVersion
{
    /// Release tuple.
    pub release: Release,
    /// Family bucket the release belongs to.
    pub family: ReleaseFamily,
    /// Target word size.
    pub pointer_width: PointerWidth,
    /// Target C data model.
    pub data_model: DataModel,
}

impl InterpreterVersion
{
    /// Code-object variant referenced by frames of this version.
    pub const fn code_shape(&self) -> CodeShape
    {
        match self.family {
            ReleaseFamily::Python2 => CodeShape::Classic,
            ReleaseFamily::Python3 => CodeShape::KeywordOnly,
        }
    }

    /// Object kind used for function names and file names.
    pub const fn text_kind(&self) -> ObjectKind
    {
        match self.family {
            ReleaseFamily::Python2 => ObjectKind::String,
            ReleaseFamily::Python3 => ObjectKind::Unicode,
        }
    }

    /// Object kind holding the line-number table.
    pub const fn line_table_kind(&self) -> ObjectKind
    {
        match self.family {
            ReleaseFamily::Python2 => ObjectKind::String,
            ReleaseFamily::Python3 => ObjectKind::Bytes,
        }
    }

    /// Object kind used for small integers.
    pub const fn int_kind(&self) -> ObjectKind
    {
        match self.family {
            ReleaseFamily::Python2 => ObjectKind::Int,
            ReleaseFamily::Python3 => ObjectKind::Long,
        }
    }

    /// Pointer width in bytes.
    pub const fn word_size(&self) -> usize
    {
        self.pointer_width.bytes()
    }

    /// Size of C `long` in bytes.
    pub const fn long_size(&self) -> usize
    {
        self.data_model.long_size(self.pointer_width)
    }
}

impl fmt::Display for InterpreterVersion
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "{} ({}, {}-bit, {:?})",
            self.release,
            self.family,
            self.pointer_width.bytes() * 8,
            self.data_model
        )
    }
}

/// Select the interpreter version for a detected `(major, minor, width)` tuple
///
/// Uses the Unix data model. See [`select_with_model`] for Windows targets.
///
/// ## Errors
///
/// `UnsupportedVersion` when the release is outside 2.4–3.1, the width is
/// not 4 or 8 bytes, or the release has no layouts at that width.
///
/// ## Example
///
/// ```rust
/// use pyscope_core::version::{select, ReleaseFamily};
///
/// let version = select(2, 7, 8)?;
/// assert_eq!(version.family, ReleaseFamily::Python2);
/// assert!(select(3, 2, 8).is_err());
/// # Ok::<(), pyscope_core::error::DecodeError>(())
/// ```
pub fn select(major: u8, minor: u8, pointer_width: usize) -> Result<InterpreterVersion>
{
    select_with_model(major, minor, pointer_width, DataModel::default())
}

/// Like [`select`] with an explicit C data model.
pub fn select_with_model(
    major: u8,
    minor: u8,
    pointer_width: usize,
    data_model: DataModel,
) -> Result<InterpreterVersion>
{
    let release = Release::new(major, minor);
    let reject = |reason: &str| DecodeError::UnsupportedVersion {
        release,
        pointer_width,
        reason: reason.to_string(),
    };

    let width = PointerWidth::from_bytes(pointer_width).ok_or_else(|| reject("pointer width must be 4 or 8 bytes"))?;

    let family = if ReleaseFamily::Python2.range().contains(release) {
        ReleaseFamily::Python2
    } else if ReleaseFamily::Python3.range().contains(release) {
        ReleaseFamily::Python3
    } else {
        return Err(reject("release outside the supported 2.4-3.1 range"));
    };

    if release == Release::new(2, 4) && width == PointerWidth::Eight {
        return Err(reject("64-bit 2.4 builds use int-sized object headers"));
    }

    let version = InterpreterVersion {
        release,
        family,
        pointer_width: width,
        data_model,
    };
    tracing::debug!("selected interpreter version {version}");
    Ok(version)
}
