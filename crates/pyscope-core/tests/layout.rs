//! Tests for the layout catalog

use pyscope_core::error::DecodeError;
use pyscope_core::layout::{fields, layout_for, CatalogEntry, FieldDecl, FieldType, LayoutCatalog, ObjectKind};
use pyscope_core::version::{select, select_with_model, DataModel, Release, VersionRange};

#[test]
fn test_frame_offsets_64bit()
{
    let frame = layout_for(ObjectKind::Frame, &select(2, 7, 8).unwrap()).unwrap();
    assert_eq!(frame.offset(fields::F_BACK).unwrap(), 24);
    assert_eq!(frame.offset(fields::F_CODE).unwrap(), 32);
    assert_eq!(frame.offset(fields::F_TRACE).unwrap(), 80);
    assert_eq!(frame.offset(fields::F_LASTI).unwrap(), 120);
    assert_eq!(frame.offset(fields::F_LINENO).unwrap(), 124);
    assert_eq!(frame.offset(fields::F_LOCALSPLUS).unwrap(), 376);
}

#[test]
fn test_frame_offsets_32bit()
{
    let frame = layout_for(ObjectKind::Frame, &select(2, 7, 4).unwrap()).unwrap();
    assert_eq!(frame.offset(fields::F_BACK).unwrap(), 12);
    assert_eq!(frame.offset(fields::F_LASTI).unwrap(), 60);
    assert_eq!(frame.offset(fields::F_LOCALSPLUS).unwrap(), 312);
}

#[test]
fn test_narrow_frame_entry_wins_for_2_4()
{
    let frame = layout_for(ObjectKind::Frame, &select(2, 4, 4).unwrap()).unwrap();
    assert_eq!(frame.range(), VersionRange::single(Release::new(2, 4)));
    assert_eq!(frame.offset(fields::F_RESTRICTED).unwrap(), 68);
    assert_eq!(frame.offset(fields::F_IBLOCK).unwrap(), 72);
    assert_eq!(frame.offset(fields::F_NLOCALS).unwrap(), 316);
    assert_eq!(frame.offset(fields::F_LOCALSPLUS).unwrap(), 332);

    let wide = layout_for(ObjectKind::Frame, &select(2, 5, 4).unwrap()).unwrap();
    assert!(!wide.has_field(fields::F_RESTRICTED));
    assert_eq!(wide.offset(fields::F_IBLOCK).unwrap(), 68);
}

#[test]
fn test_code_offsets_per_family()
{
    let classic = layout_for(ObjectKind::Code, &select(2, 7, 8).unwrap()).unwrap();
    assert_eq!(classic.offset(fields::CO_FILENAME).unwrap(), 80);
    assert_eq!(classic.offset(fields::CO_NAME).unwrap(), 88);
    assert_eq!(classic.offset(fields::CO_FIRSTLINENO).unwrap(), 96);
    assert_eq!(classic.offset(fields::CO_LNOTAB).unwrap(), 104);
    assert!(!classic.has_field(fields::CO_KWONLYARGCOUNT));

    let keyword_only = layout_for(ObjectKind::Code, &select(3, 1, 8).unwrap()).unwrap();
    assert_eq!(keyword_only.offset(fields::CO_KWONLYARGCOUNT).unwrap(), 20);
    assert_eq!(keyword_only.offset(fields::CO_FILENAME).unwrap(), 88);
    assert_eq!(keyword_only.offset(fields::CO_NAME).unwrap(), 96);
    assert_eq!(keyword_only.offset(fields::CO_FIRSTLINENO).unwrap(), 104);
    assert_eq!(keyword_only.offset(fields::CO_LNOTAB).unwrap(), 112);
    assert_eq!(keyword_only.offset(fields::CO_ZOMBIEFRAME).unwrap(), 120);
}

#[test]
fn test_thread_state_overflow_flags_only_on_3x()
{
    let py3 = layout_for(ObjectKind::ThreadState, &select(3, 0, 8).unwrap()).unwrap();
    assert_eq!(py3.offset(fields::TS_RECURSION_DEPTH).unwrap(), 24);
    assert_eq!(py3.offset(fields::TS_OVERFLOWED).unwrap(), 28);
    assert_eq!(py3.offset(fields::TS_RECURSION_CRITICAL).unwrap(), 29);
    assert_eq!(py3.offset(fields::TS_TRACING).unwrap(), 32);

    let py2 = layout_for(ObjectKind::ThreadState, &select(2, 6, 8).unwrap()).unwrap();
    assert!(!py2.has_field(fields::TS_OVERFLOWED));
    assert_eq!(py2.offset(fields::TS_TRACING).unwrap(), 28);

    // 2.4 and 2.5-2.7 are separate entries with the same fields.
    let py24 = layout_for(ObjectKind::ThreadState, &select(2, 4, 4).unwrap()).unwrap();
    let py25 = layout_for(ObjectKind::ThreadState, &select(2, 5, 4).unwrap()).unwrap();
    assert_ne!(py24.range(), py25.range());
    assert_eq!(py24.fields(), py25.fields());
}

#[test]
fn test_string_offsets_follow_data_model()
{
    let lp64 = layout_for(ObjectKind::String, &select(2, 7, 8).unwrap()).unwrap();
    assert_eq!(lp64.offset(fields::OB_SVAL).unwrap(), 36);

    let llp64 = layout_for(ObjectKind::String, &select_with_model(2, 7, 8, DataModel::Llp64).unwrap()).unwrap();
    assert_eq!(llp64.offset(fields::OB_SVAL).unwrap(), 32);

    let narrow = layout_for(ObjectKind::String, &select(2, 7, 4).unwrap()).unwrap();
    assert_eq!(narrow.offset(fields::OB_SVAL).unwrap(), 20);
}

#[test]
fn test_container_offsets()
{
    let tuple64 = layout_for(ObjectKind::Tuple, &select(2, 7, 8).unwrap()).unwrap();
    assert_eq!(tuple64.offset(fields::OB_ITEM).unwrap(), 24);
    let tuple32 = layout_for(ObjectKind::Tuple, &select(3, 1, 4).unwrap()).unwrap();
    assert_eq!(tuple32.offset(fields::OB_ITEM).unwrap(), 12);

    let unicode = layout_for(ObjectKind::Unicode, &select(3, 1, 8).unwrap()).unwrap();
    assert_eq!(unicode.offset(fields::UNICODE_LENGTH).unwrap(), 16);
    assert_eq!(unicode.offset(fields::UNICODE_STR).unwrap(), 24);
}

#[test]
fn test_type_version_tag_from_2_6()
{
    let old = layout_for(ObjectKind::Type, &select(2, 5, 8).unwrap()).unwrap();
    assert!(!old.has_field(fields::TP_VERSION_TAG));
    let new = layout_for(ObjectKind::Type, &select(2, 6, 8).unwrap()).unwrap();
    assert!(new.has_field(fields::TP_VERSION_TAG));
    assert_eq!(old.offset(fields::TP_NAME).unwrap(), new.offset(fields::TP_NAME).unwrap());
}

#[test]
fn test_family_specific_kinds_are_rejected_elsewhere()
{
    let py3 = select(3, 1, 8).unwrap();
    assert!(matches!(
        layout_for(ObjectKind::String, &py3),
        Err(DecodeError::UnsupportedVersion { .. })
    ));
    let py2 = select(2, 7, 8).unwrap();
    assert!(matches!(
        layout_for(ObjectKind::Bytes, &py2),
        Err(DecodeError::UnsupportedVersion { .. })
    ));
}

#[test]
fn test_unknown_field()
{
    let frame = layout_for(ObjectKind::Frame, &select(2, 7, 8).unwrap()).unwrap();
    match frame.field("f_nonsense") {
        Err(DecodeError::UnknownField { kind, field }) => {
            assert_eq!(kind, ObjectKind::Frame);
            assert_eq!(field, "f_nonsense");
        }
        other => panic!("expected UnknownField, got {other:?}"),
    }
}

#[test]
fn test_offsets_are_increasing_and_inside_size()
{
    let version = select(3, 1, 8).unwrap();
    for entry in LayoutCatalog::builtin().entries() {
        if !entry.range.contains(version.release) {
            continue;
        }
        let layout = layout_for(entry.kind, &version).unwrap();
        for pair in layout.fields().windows(2) {
            assert!(pair[0].offset + pair[0].size <= pair[1].offset, "{} in {}", pair[1].name, entry.kind);
        }
        let last = layout.fields().last().unwrap();
        assert!(last.offset + last.size <= layout.size());
    }
}

const R25: Release = Release::new(2, 5);
const R26: Release = Release::new(2, 6);
const R27: Release = Release::new(2, 7);

const FIRST: &[FieldDecl] = &[FieldDecl::new("first", FieldType::Address)];
const SECOND: &[FieldDecl] = &[FieldDecl::new("second", FieldType::Address)];
const WIDE: &[FieldDecl] = &[FieldDecl::new("wide", FieldType::Address)];

fn catalog(boundaries: &'static [Release]) -> LayoutCatalog
{
    LayoutCatalog::new(vec![
        CatalogEntry {
            kind: ObjectKind::Frame,
            range: VersionRange::new(R25, R27),
            boundaries: &[],
            segments: &[WIDE],
        },
        CatalogEntry {
            kind: ObjectKind::Frame,
            range: VersionRange::new(R25, R26),
            boundaries: &[],
            segments: &[FIRST],
        },
        CatalogEntry {
            kind: ObjectKind::Frame,
            range: VersionRange::new(R26, R27),
            boundaries,
            segments: &[SECOND],
        },
    ])
}

#[test]
fn test_narrowest_entry_wins()
{
    let catalog = catalog(&[]);
    assert_eq!(catalog.select_entry(ObjectKind::Frame, R25), Some(1));
    assert_eq!(catalog.select_entry(ObjectKind::Frame, R27), Some(2));
    assert_eq!(catalog.select_entry(ObjectKind::Code, R27), None);
}

#[test]
fn test_boundary_claim_breaks_ties()
{
    // Without a claim, declaration order decides.
    assert_eq!(catalog(&[]).select_entry(ObjectKind::Frame, R26), Some(1));

    let claimed = catalog(&[R26]);
    assert_eq!(claimed.select_entry(ObjectKind::Frame, R26), Some(2));

    let version = select(2, 6, 8).unwrap();
    let layout = claimed.layout_for(ObjectKind::Frame, &version).unwrap();
    assert!(layout.has_field("second"));
}
