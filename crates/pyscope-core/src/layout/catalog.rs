//! Built-in layout declarations and the lookup that selects between them.
//!
//! Declarations are split into segments (object heads, shared frame fields,
//! per-release tails) so adjacent releases share data instead of repeating it.
//! The offsets for every entry are computed once, for both pointer widths and
//! both data models, the first time the catalog is used.
//!
//! ## Choosing between overlapping entries
//!
//! Entries for the same kind may overlap. The narrowest range containing the
//! release wins. When two equally narrow entries both contain it, the one
//! listing that release in its `boundaries` wins, then declaration order.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use smallvec::SmallVec;

use super::fields::*;
use super::{FieldType, IntWidth, ItemKind, LayoutBuilder, ObjectKind, ObjectLayout};
use crate::error::{DecodeError, Result};
use crate::version::{DataModel, InterpreterVersion, PointerWidth, Release, VersionRange};

/// A field declaration: name plus semantic type, no offset yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl
{
    /// Field name.
    pub name: &'static str,
    /// Semantic type.
    pub ty: FieldType,
}

impl FieldDecl
{
    /// Declare a field.
    pub const fn new(name: &'static str, ty: FieldType) -> Self
    {
        Self { name, ty }
    }
}

const fn ptr(name: &'static str) -> FieldDecl
{
    FieldDecl::new(name, FieldType::Address)
}

const fn int(name: &'static str) -> FieldDecl
{
    FieldDecl::new(name, FieldType::Integer(IntWidth::Int))
}

const fn long(name: &'static str) -> FieldDecl
{
    FieldDecl::new(name, FieldType::Integer(IntWidth::Long))
}

const fn word(name: &'static str) -> FieldDecl
{
    FieldDecl::new(name, FieldType::Integer(IntWidth::Word))
}

const fn byte(name: &'static str) -> FieldDecl
{
    FieldDecl::new(name, FieldType::Integer(IntWidth::Byte))
}

const fn items(name: &'static str, kind: ItemKind) -> FieldDecl
{
    FieldDecl::new(name, FieldType::Items(kind))
}

/// One catalog entry: a kind, the releases it serves, and its field segments.
#[derive(Debug, Clone)]
pub struct CatalogEntry
{
    /// Object kind described.
    pub kind: ObjectKind,
    /// Releases served.
    pub range: VersionRange,
    /// Releases this entry explicitly owns when a tie has to be broken.
    pub boundaries: &'static [Release],
    /// Field segments, concatenated in order.
    pub segments: &'static [&'static [FieldDecl]],
}

impl CatalogEntry
{
    /// Returns `true` if the entry documents `release` as one of its boundaries.
    pub fn claims(&self, release: Release) -> bool
    {
        self.boundaries.contains(&release)
    }

    fn layout(&self, width: PointerWidth, model: DataModel) -> ObjectLayout
    {
        let mut builder = LayoutBuilder::new(self.kind, self.range, width, model);
        for decl in self.segments.iter().flat_map(|segment| segment.iter()) {
            builder.push(decl.name, decl.ty);
        }
        builder.build()
    }
}

const R24: Release = Release::new(2, 4);
const R25: Release = Release::new(2, 5);
const R26: Release = Release::new(2, 6);
const R27: Release = Release::new(2, 7);
const R30: Release = Release::new(3, 0);
const R31: Release = Release::new(3, 1);

const ALL_RELEASES: VersionRange = VersionRange::new(R24, R31);

const OBJECT_HEAD: &[FieldDecl] = &[word(OB_REFCNT), ptr(OB_TYPE)];
const VAR_HEAD: &[FieldDecl] = &[word(OB_REFCNT), ptr(OB_TYPE), word(OB_SIZE)];

const CODE_COUNTS_PY2: &[FieldDecl] = &[int(CO_ARGCOUNT), int(CO_NLOCALS), int(CO_STACKSIZE), int(CO_FLAGS)];
const CODE_COUNTS_PY3: &[FieldDecl] = &[
    int(CO_ARGCOUNT),
    int(CO_KWONLYARGCOUNT),
    int(CO_NLOCALS),
    int(CO_STACKSIZE),
    int(CO_FLAGS),
];
const CODE_BODY: &[FieldDecl] = &[
    ptr(CO_CODE),
    ptr(CO_CONSTS),
    ptr(CO_NAMES),
    ptr(CO_VARNAMES),
    ptr(CO_FREEVARS),
    ptr(CO_CELLVARS),
    ptr(CO_FILENAME),
    ptr(CO_NAME),
    int(CO_FIRSTLINENO),
    ptr(CO_LNOTAB),
];
const CODE_TAIL_PY3: &[FieldDecl] = &[ptr(CO_ZOMBIEFRAME)];

const FUNCTION_BODY: &[FieldDecl] = &[ptr(FUNC_CODE)];

/// `CO_MAXBLOCKS` try-blocks of three ints each.
const BLOCKSTACK: FieldType = FieldType::Struct { size: 20 * 12, align: 4 };

const FRAME_COMMON: &[FieldDecl] = &[
    ptr(F_BACK),
    ptr(F_CODE),
    ptr(F_BUILTINS),
    ptr(F_GLOBALS),
    ptr(F_LOCALS),
    ptr(F_VALUESTACK),
    ptr(F_STACKTOP),
    ptr(F_TRACE),
    ptr(F_EXC_TYPE),
    ptr(F_EXC_VALUE),
    ptr(F_EXC_TRACEBACK),
    ptr(F_TSTATE),
    int(F_LASTI),
    int(F_LINENO),
];
const FRAME_TAIL_24: &[FieldDecl] = &[
    int(F_RESTRICTED),
    int(F_IBLOCK),
    FieldDecl::new(F_BLOCKSTACK, BLOCKSTACK),
    int(F_NLOCALS),
    int(F_NCELLS),
    int(F_NFREEVARS),
    int(F_STACKSIZE),
    items(F_LOCALSPLUS, ItemKind::Address),
];
const FRAME_TAIL: &[FieldDecl] = &[
    int(F_IBLOCK),
    FieldDecl::new(F_BLOCKSTACK, BLOCKSTACK),
    items(F_LOCALSPLUS, ItemKind::Address),
];

const THREAD_HEAD: &[FieldDecl] = &[ptr(TS_NEXT), ptr(TS_INTERP), ptr(TS_FRAME), int(TS_RECURSION_DEPTH)];
const THREAD_OVERFLOW_FLAGS: &[FieldDecl] = &[byte(TS_OVERFLOWED), byte(TS_RECURSION_CRITICAL)];
const THREAD_BODY: &[FieldDecl] = &[
    int(TS_TRACING),
    int(TS_USE_TRACING),
    ptr(TS_C_PROFILEFUNC),
    ptr(TS_C_TRACEFUNC),
    ptr(TS_C_PROFILEOBJ),
    ptr(TS_C_TRACEOBJ),
    ptr(TS_CUREXC_TYPE),
    ptr(TS_CUREXC_VALUE),
    ptr(TS_CUREXC_TRACEBACK),
    ptr(TS_EXC_TYPE),
    ptr(TS_EXC_VALUE),
    ptr(TS_EXC_TRACEBACK),
    ptr(TS_DICT),
    int(TS_TICK_COUNTER),
    int(TS_GILSTATE_COUNTER),
    ptr(TS_ASYNC_EXC),
    long(TS_THREAD_ID),
];

const STRING_BODY: &[FieldDecl] = &[long(OB_SHASH), int(OB_SSTATE), items(OB_SVAL, ItemKind::Char)];
const BYTES_BODY: &[FieldDecl] = &[long(OB_SHASH), items(OB_SVAL, ItemKind::Char)];
const UNICODE_BODY: &[FieldDecl] = &[word(UNICODE_LENGTH), ptr(UNICODE_STR), long(UNICODE_HASH)];
const TUPLE_BODY: &[FieldDecl] = &[items(OB_ITEM, ItemKind::Address)];
const INT_BODY: &[FieldDecl] = &[long(OB_IVAL)];
const LONG_BODY_15: &[FieldDecl] = &[items(OB_DIGIT, ItemKind::Digit15)];
const LONG_BODY_30: &[FieldDecl] = &[items(OB_DIGIT, ItemKind::Digit30)];
const CFUNCTION_BODY: &[FieldDecl] = &[ptr(M_ML), ptr(M_SELF), ptr(M_MODULE)];
const METHODDEF_BODY: &[FieldDecl] = &[ptr(ML_NAME)];

const TYPE_SLOTS: &[FieldDecl] = &[
    ptr(TP_NAME),
    word(TP_BASICSIZE),
    word(TP_ITEMSIZE),
    ptr("tp_dealloc"),
    ptr("tp_print"),
    ptr("tp_getattr"),
    ptr("tp_setattr"),
    ptr("tp_compare"),
    ptr("tp_repr"),
    ptr("tp_as_number"),
    ptr("tp_as_sequence"),
    ptr("tp_as_mapping"),
    ptr("tp_hash"),
    ptr("tp_call"),
    ptr("tp_str"),
    ptr("tp_getattro"),
    ptr("tp_setattro"),
    ptr("tp_as_buffer"),
    long(TP_FLAGS),
    ptr("tp_doc"),
    ptr("tp_traverse"),
    ptr("tp_clear"),
    ptr("tp_richcompare"),
    word("tp_weaklistoffset"),
    ptr("tp_iter"),
    ptr("tp_iternext"),
    ptr("tp_methods"),
    ptr("tp_members"),
    ptr("tp_getset"),
    ptr("tp_base"),
    ptr("tp_dict"),
    ptr("tp_descr_get"),
    ptr("tp_descr_set"),
    word("tp_dictoffset"),
    ptr("tp_init"),
    ptr("tp_alloc"),
    ptr("tp_new"),
    ptr("tp_free"),
    ptr("tp_is_gc"),
    ptr("tp_bases"),
    ptr("tp_mro"),
    ptr("tp_cache"),
    ptr("tp_subclasses"),
    ptr("tp_weaklist"),
    ptr("tp_del"),
];
const TYPE_VERSION_TAG: &[FieldDecl] = &[int(TP_VERSION_TAG)];

fn entry(
    kind: ObjectKind,
    range: VersionRange,
    boundaries: &'static [Release],
    segments: &'static [&'static [FieldDecl]],
) -> CatalogEntry
{
    CatalogEntry {
        kind,
        range,
        boundaries,
        segments,
    }
}

fn builtin_entries() -> Vec<CatalogEntry>
{
    vec![
        entry(ObjectKind::Object, ALL_RELEASES, &[], &[OBJECT_HEAD]),
        entry(
            ObjectKind::Code,
            VersionRange::new(R24, R27),
            &[R24, R27],
            &[OBJECT_HEAD, CODE_COUNTS_PY2, CODE_BODY],
        ),
        entry(
            ObjectKind::Code,
            VersionRange::new(R30, R31),
            &[R30, R31],
            &[OBJECT_HEAD, CODE_COUNTS_PY3, CODE_BODY, CODE_TAIL_PY3],
        ),
        entry(ObjectKind::Function, ALL_RELEASES, &[], &[OBJECT_HEAD, FUNCTION_BODY]),
        // 2.5 dropped f_restricted and the cached local counts; the wide entry
        // describes 2.5-3.1 and the single-release entry overrides it for 2.4.
        entry(ObjectKind::Frame, ALL_RELEASES, &[R25, R31], &[VAR_HEAD, FRAME_COMMON, FRAME_TAIL]),
        entry(
            ObjectKind::Frame,
            VersionRange::single(R24),
            &[R24],
            &[VAR_HEAD, FRAME_COMMON, FRAME_TAIL_24],
        ),
        entry(ObjectKind::ThreadState, VersionRange::single(R24), &[R24], &[THREAD_HEAD, THREAD_BODY]),
        entry(
            ObjectKind::ThreadState,
            VersionRange::new(R25, R27),
            &[R25, R27],
            &[THREAD_HEAD, THREAD_BODY],
        ),
        entry(
            ObjectKind::ThreadState,
            VersionRange::new(R30, R31),
            &[R30, R31],
            &[THREAD_HEAD, THREAD_OVERFLOW_FLAGS, THREAD_BODY],
        ),
        entry(ObjectKind::String, VersionRange::new(R24, R27), &[], &[VAR_HEAD, STRING_BODY]),
        entry(ObjectKind::Bytes, VersionRange::new(R30, R31), &[], &[VAR_HEAD, BYTES_BODY]),
        entry(ObjectKind::Unicode, ALL_RELEASES, &[], &[OBJECT_HEAD, UNICODE_BODY]),
        entry(ObjectKind::Tuple, ALL_RELEASES, &[], &[VAR_HEAD, TUPLE_BODY]),
        // tp_version_tag appeared in 2.6.
        entry(ObjectKind::Type, ALL_RELEASES, &[R24], &[VAR_HEAD, TYPE_SLOTS]),
        entry(
            ObjectKind::Type,
            VersionRange::new(R26, R31),
            &[R26],
            &[VAR_HEAD, TYPE_SLOTS, TYPE_VERSION_TAG],
        ),
        entry(ObjectKind::Int, VersionRange::new(R24, R27), &[], &[OBJECT_HEAD, INT_BODY]),
        entry(ObjectKind::Long, VersionRange::single(R30), &[R30], &[VAR_HEAD, LONG_BODY_15]),
        entry(ObjectKind::Long, VersionRange::single(R31), &[R31], &[VAR_HEAD, LONG_BODY_30]),
        entry(ObjectKind::CFunction, ALL_RELEASES, &[], &[OBJECT_HEAD, CFUNCTION_BODY]),
        entry(ObjectKind::MethodDef, ALL_RELEASES, &[], &[METHODDEF_BODY]),
    ]
}

const TARGETS: [(PointerWidth, DataModel); 4] = [
    (PointerWidth::Four, DataModel::Lp64),
    (PointerWidth::Four, DataModel::Llp64),
    (PointerWidth::Eight, DataModel::Lp64),
    (PointerWidth::Eight, DataModel::Llp64),
];

static BUILTIN: Lazy<LayoutCatalog> = Lazy::new(|| LayoutCatalog::new(builtin_entries()));

/// Registry of layout entries with precomputed offsets
///
/// The catalog is immutable after construction and can be shared freely
/// between threads.
#[derive(Debug)]
pub struct LayoutCatalog
{
    entries: Vec<CatalogEntry>,
    layouts: HashMap<(usize, PointerWidth, DataModel), ObjectLayout>,
}

impl LayoutCatalog
{
    /// Build a catalog from explicit entries, computing every target's offsets.
    pub fn new(entries: Vec<CatalogEntry>) -> Self
    {
        let mut layouts = HashMap::with_capacity(entries.len() * TARGETS.len());
        for (index, entry) in entries.iter().enumerate() {
            for (width, model) in TARGETS {
                layouts.insert((index, width, model), entry.layout(width, model));
            }
        }
        Self { entries, layouts }
    }

    /// The catalog compiled into this crate.
    pub fn builtin() -> &'static LayoutCatalog
    {
        &BUILTIN
    }

    /// All entries in declaration order.
    pub fn entries(&self) -> &[CatalogEntry]
    {
        &self.entries
    }

    /// Layout of `kind` for `version`
    ///
    /// ## Errors
    ///
    /// `UnsupportedVersion` if no entry for `kind` covers the release.
    pub fn layout_for(&self, kind: ObjectKind, version: &InterpreterVersion) -> Result<&ObjectLayout>
    {
        let index = self
            .select_entry(kind, version.release)
            .ok_or_else(|| DecodeError::UnsupportedVersion {
                release: version.release,
                pointer_width: version.word_size(),
                reason: format!("no {kind} layout covers this release"),
            })?;

        self.layouts
            .get(&(index, version.pointer_width, version.data_model))
            .ok_or_else(|| DecodeError::UnsupportedVersion {
                release: version.release,
                pointer_width: version.word_size(),
                reason: format!("no {kind} layout for this target"),
            })
    }

    /// Index of the entry that serves `kind` at `release`, if any.
    pub fn select_entry(&self, kind: ObjectKind, release: Release) -> Option<usize>
    {
        let candidates: SmallVec<[usize; 4]> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.kind == kind && entry.range.contains(release))
            .map(|(index, _)| index)
            .collect();

        let chosen = candidates.iter().copied().min_by_key(|&index| {
            let entry = &self.entries[index];
            (entry.range.span(), !entry.claims(release), index)
        });

        if candidates.len() > 1 {
            if let Some(index) = chosen {
                tracing::trace!(
                    "{} candidate {kind} layouts for {release}, chose {}",
                    candidates.len(),
                    self.entries[index].range
                );
            }
        }
        chosen
    }
}

/// Layout of `kind` for `version` from the built-in catalog.
pub fn layout_for(kind: ObjectKind, version: &InterpreterVersion) -> Result<&'static ObjectLayout>
{
    LayoutCatalog::builtin().layout_for(kind, version)
}
