//! # Layout Catalog
//!
//! Per-release descriptions of every interpreter object the decoder reads.
//!
//! Each [`ObjectLayout`] is an ordered list of fields with absolute byte
//! offsets from the object's base address. Layouts are plain data: they are
//! computed once from the declarations in [`catalog`] using C alignment rules
//! for each pointer width and data model, then never change.
//!
//! ## Lookup
//!
//! ```rust
//! use pyscope_core::layout::{fields, layout_for, ObjectKind};
//! use pyscope_core::version::select;
//!
//! let version = select(2, 7, 8)?;
//! let frame = layout_for(ObjectKind::Frame, &version)?;
//! assert_eq!(frame.offset(fields::F_BACK)?, 24);
//! # Ok::<(), pyscope_core::error::DecodeError>(())
//! ```

pub mod builder;
pub mod catalog;
pub mod fields;

use std::fmt;

pub use builder::LayoutBuilder;
pub use catalog::{layout_for, CatalogEntry, FieldDecl, LayoutCatalog};

use crate::error::{DecodeError, Result};
use crate::version::{DataModel, PointerWidth, VersionRange};

/// Interpreter object kinds the catalog describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind
{
    /// Bare object head (`ob_refcnt`, `ob_type`).
    Object,
    /// Compiled code object.
    Code,
    /// Python function object.
    Function,
    /// Interpreter activation record.
    Frame,
    /// Per-thread interpreter state.
    ThreadState,
    /// 2.x byte string.
    String,
    /// 3.x bytes object.
    Bytes,
    /// Unicode string.
    Unicode,
    /// Tuple.
    Tuple,
    /// Type object.
    Type,
    /// 2.x machine integer.
    Int,
    /// 3.x arbitrary precision integer.
    Long,
    /// Builtin function object.
    CFunction,
    /// Builtin method table entry.
    MethodDef,
}

impl ObjectKind
{
    /// Every kind, in declaration order.
    pub const ALL: [ObjectKind; 14] = [
        ObjectKind::Object,
        ObjectKind::Code,
        ObjectKind::Function,
        ObjectKind::Frame,
        ObjectKind::ThreadState,
        ObjectKind::String,
        ObjectKind::Bytes,
        ObjectKind::Unicode,
        ObjectKind::Tuple,
        ObjectKind::Type,
        ObjectKind::Int,
        ObjectKind::Long,
        ObjectKind::CFunction,
        ObjectKind::MethodDef,
    ];

    /// Lowercase name, as accepted on the command line.
    pub const fn name(self) -> &'static str
    {
        match self {
            ObjectKind::Object => "object",
            ObjectKind::Code => "code",
            ObjectKind::Function => "function",
            ObjectKind::Frame => "frame",
            ObjectKind::ThreadState => "threadstate",
            ObjectKind::String => "string",
            ObjectKind::Bytes => "bytes",
            ObjectKind::Unicode => "unicode",
            ObjectKind::Tuple => "tuple",
            ObjectKind::Type => "type",
            ObjectKind::Int => "int",
            ObjectKind::Long => "long",
            ObjectKind::CFunction => "cfunction",
            ObjectKind::MethodDef => "methoddef",
        }
    }
}

impl fmt::Display for ObjectKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ObjectKind
{
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {
        let lower = s.to_lowercase();
        ObjectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| format!("Unknown object kind: {s}"))
    }
}

/// Width class of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth
{
    /// C `char`.
    Byte,
    /// C `int` (4 bytes on every supported target).
    Int,
    /// C `long` (depends on the data model).
    Long,
    /// `size_t` / `Py_ssize_t` (pointer sized).
    Word,
}

/// Element type of a variable-length trailing array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind
{
    /// Object pointers (`ob_item`, `f_localsplus`).
    Address,
    /// Raw characters (`ob_sval`).
    Char,
    /// 15-bit long digits stored in 2-byte units.
    Digit15,
    /// 30-bit long digits stored in 4-byte units.
    Digit30,
}

impl ItemKind
{
    /// Size of one element in bytes.
    pub const fn size(self, width: PointerWidth) -> usize
    {
        match self {
            ItemKind::Address => width.bytes(),
            ItemKind::Char => 1,
            ItemKind::Digit15 => 2,
            ItemKind::Digit30 => 4,
        }
    }
}

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType
{
    /// Signed integer.
    Integer(IntWidth),
    /// Pointer into the target's address space.
    Address,
    /// Fixed-size inline character array.
    InlineChars
    {
        /// Declared capacity in bytes.
        capacity: usize,
        /// Stop at the first NUL byte instead of using the full capacity.
        nul_terminated: bool,
    },
    /// Fixed-size inline struct, read as opaque bytes.
    Struct
    {
        /// Size in bytes.
        size: usize,
        /// Alignment in bytes.
        align: usize,
    },
    /// Variable-length trailing array; the count lives elsewhere in the object.
    Items(ItemKind),
}

impl FieldType
{
    /// Size and alignment of the field for a target.
    ///
    /// Trailing arrays report the size of a single element.
    pub const fn size_align(self, width: PointerWidth, model: DataModel) -> (usize, usize)
    {
        match self {
            FieldType::Integer(IntWidth::Byte) => (1, 1),
            FieldType::Integer(IntWidth::Int) => (4, 4),
            FieldType::Integer(IntWidth::Long) => {
                let size = model.long_size(width);
                (size, size)
            }
            FieldType::Integer(IntWidth::Word) | FieldType::Address => (width.bytes(), width.bytes()),
            FieldType::InlineChars { capacity, .. } => (capacity, 1),
            FieldType::Struct { size, align } => (size, align),
            FieldType::Items(item) => (item.size(width), item.size(width)),
        }
    }

    /// Short label used in layout reports.
    pub const fn label(self) -> &'static str
    {
        match self {
            FieldType::Integer(IntWidth::Byte) => "char",
            FieldType::Integer(IntWidth::Int) => "int",
            FieldType::Integer(IntWidth::Long) => "long",
            FieldType::Integer(IntWidth::Word) => "ssize",
            FieldType::Address => "ptr",
            FieldType::InlineChars { .. } => "chars",
            FieldType::Struct { .. } => "struct",
            FieldType::Items(ItemKind::Address) => "ptr[]",
            FieldType::Items(ItemKind::Char) => "char[]",
            FieldType::Items(ItemKind::Digit15) | FieldType::Items(ItemKind::Digit30) => "digit[]",
        }
    }
}

/// One field of an [`ObjectLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout
{
    /// Field name as declared by the target's headers.
    pub name: &'static str,
    /// Absolute offset from the object base.
    pub offset: usize,
    /// Size in bytes (one element for trailing arrays).
    pub size: usize,
    /// Semantic type.
    pub ty: FieldType,
}

/// Field offsets of one object kind for one release range and target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLayout
{
    kind: ObjectKind,
    range: VersionRange,
    width: PointerWidth,
    model: DataModel,
    fields: Vec<FieldLayout>,
    size: usize,
}

impl ObjectLayout
{
    pub(crate) fn new(
        kind: ObjectKind,
        range: VersionRange,
        width: PointerWidth,
        model: DataModel,
        fields: Vec<FieldLayout>,
        size: usize,
    ) -> Self
    {
        Self {
            kind,
            range,
            width,
            model,
            fields,
            size,
        }
    }

    /// Object kind described.
    pub fn kind(&self) -> ObjectKind
    {
        self.kind
    }

    /// Releases this layout is valid for.
    pub fn range(&self) -> VersionRange
    {
        self.range
    }

    /// Pointer width the offsets were computed for.
    pub fn pointer_width(&self) -> PointerWidth
    {
        self.width
    }

    /// Data model the offsets were computed for.
    pub fn data_model(&self) -> DataModel
    {
        self.model
    }

    /// `sizeof` the fixed part of the object, including one trailing element.
    pub fn size(&self) -> usize
    {
        self.size
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldLayout]
    {
        &self.fields
    }

    /// Returns `true` if the layout declares `name`.
    pub fn has_field(&self, name: &str) -> bool
    {
        self.fields.iter().any(|field| field.name == name)
    }

    /// Look up a field by name.
    ///
    /// ## Errors
    ///
    /// `UnknownField` if this layout does not declare `name`.
    pub fn field(&self, name: &str) -> Result<&FieldLayout>
    {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| DecodeError::UnknownField {
                kind: self.kind,
                field: name.to_string(),
            })
    }

    /// Offset of a field by name.
    pub fn offset(&self, name: &str) -> Result<usize>
    {
        self.field(name).map(|field| field.offset)
    }
}
