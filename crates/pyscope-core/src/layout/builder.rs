//! Offset computation for layout declarations.
//!
//! Fields are placed the way a C compiler lays out a plain struct: each field
//! starts at the next multiple of its alignment, and the struct size is
//! rounded up to the largest alignment seen.

use super::{FieldLayout, FieldType, ObjectKind, ObjectLayout};
use crate::version::{DataModel, PointerWidth, VersionRange};

/// Incrementally places fields for one target.
///
/// ```rust
/// use pyscope_core::layout::{FieldType, IntWidth, LayoutBuilder, ObjectKind};
/// use pyscope_core::version::{DataModel, PointerWidth, Release, VersionRange};
///
/// let layout = LayoutBuilder::new(
///     ObjectKind::MethodDef,
///     VersionRange::single(Release::new(2, 7)),
///     PointerWidth::Eight,
///     DataModel::Lp64,
/// )
/// .field("flag", FieldType::Integer(IntWidth::Int))
/// .field("name", FieldType::Address)
/// .build();
///
/// assert_eq!(layout.offset("name").unwrap(), 8);
/// assert_eq!(layout.size(), 16);
/// ```
#[derive(Debug)]
pub struct LayoutBuilder
{
    kind: ObjectKind,
    range: VersionRange,
    width: PointerWidth,
    model: DataModel,
    fields: Vec<FieldLayout>,
    cursor: usize,
    max_align: usize,
}

impl LayoutBuilder
{
    /// Start an empty layout.
    pub fn new(kind: ObjectKind, range: VersionRange, width: PointerWidth, model: DataModel) -> Self
    {
        Self {
            kind,
            range,
            width,
            model,
            fields: Vec::new(),
            cursor: 0,
            max_align: 1,
        }
    }

    /// Append a field at the next suitably aligned offset.
    pub fn field(mut self, name: &'static str, ty: FieldType) -> Self
    {
        self.push(name, ty);
        self
    }

    /// Append a field in place.
    pub fn push(&mut self, name: &'static str, ty: FieldType)
    {
        let (size, align) = ty.size_align(self.width, self.model);
        let offset = align_up(self.cursor, align);
        self.fields.push(FieldLayout {
            name,
            offset,
            size,
            ty,
        });
        self.cursor = offset + size;
        self.max_align = self.max_align.max(align);
    }

    /// Finish the layout.
    pub fn build(self) -> ObjectLayout
    {
        let size = align_up(self.cursor, self.max_align);
        ObjectLayout::new(self.kind, self.range, self.width, self.model, self.fields, size)
    }
}

fn align_up(value: usize, align: usize) -> usize
{
    if align <= 1 {
        return value;
    }
    value.div_ceil(align) * align
}
