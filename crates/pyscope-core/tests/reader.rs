//! Tests for the remote object reader

mod common;

use common::TargetBuilder;
use pyscope_core::config::DecoderConfig;
use pyscope_core::error::DecodeError;
use pyscope_core::layout::{fields, FieldType, IntWidth, LayoutBuilder, ObjectKind};
use pyscope_core::memory::MemoryImage;
use pyscope_core::reader::{FieldValue, ObjectReader};
use pyscope_core::types::RemoteAddress;
use pyscope_core::version::{select, DataModel, PointerWidth, Release, VersionRange};

fn reader(target: &TargetBuilder) -> ObjectReader<'_, MemoryImage>
{
    ObjectReader::new(target.image(), target.version, DecoderConfig::default())
}

/// Writes a distinct value into every scalar field and reads each one back.
fn assert_fields_round_trip(major: u8, minor: u8, width: usize, kind: ObjectKind)
{
    let mut target = TargetBuilder::new(major, minor, width);
    let layout = target.layout(kind);
    let object = target.alloc(kind, 0);

    let mut expected = Vec::new();
    for (index, field) in layout.fields().iter().enumerate() {
        let value = match field.ty {
            FieldType::Integer(IntWidth::Byte) => FieldValue::Integer(index as i64 + 1),
            FieldType::Integer(_) => FieldValue::Integer(-(0x0101 * (index as i64 + 1))),
            FieldType::Address => FieldValue::Address(RemoteAddress::new(0x1000 + 8 * index as u64)),
            _ => continue,
        };
        match &value {
            FieldValue::Integer(raw) => target.set(object, kind, field.name, *raw),
            FieldValue::Address(address) => target.set_ptr(object, kind, field.name, *address),
            _ => unreachable!(),
        }
        expected.push((field.name, value));
    }

    let reader = reader(&target);
    for (name, value) in expected {
        assert_eq!(
            reader.read_field(object, layout, name).unwrap(),
            value,
            "{kind}.{name} on {major}.{minor}/{width}"
        );
    }
}

#[test]
fn test_every_field_round_trips_on_both_widths()
{
    for width in [4, 8] {
        for (major, minor) in [(2, 7), (3, 1)] {
            for kind in [ObjectKind::Frame, ObjectKind::Code, ObjectKind::ThreadState, ObjectKind::Type] {
                assert_fields_round_trip(major, minor, width, kind);
            }
        }
        assert_fields_round_trip(2, 5, width, ObjectKind::Unicode);
        assert_fields_round_trip(3, 0, width, ObjectKind::CFunction);
    }
    assert_fields_round_trip(2, 4, 4, ObjectKind::Frame);
}

#[test]
fn test_one_read_per_field()
{
    let mut target = TargetBuilder::new(2, 7, 8);
    let frame = target.alloc(ObjectKind::Frame, 0);
    target.set(frame, ObjectKind::Frame, fields::F_LINENO, 77);

    let reader = reader(&target);
    let before = target.image().reads();
    assert_eq!(reader.read_integer(frame, ObjectKind::Frame, fields::F_LINENO).unwrap(), 77);
    assert_eq!(reader.read_integer(frame, ObjectKind::Frame, fields::F_LINENO).unwrap(), 77);
    assert_eq!(target.image().reads() - before, 2);
}

#[test]
fn test_null_object_short_circuits()
{
    let target = TargetBuilder::new(2, 7, 8);
    let reader = reader(&target);
    let layout = target.layout(ObjectKind::Frame);

    assert_eq!(
        reader.read_field(RemoteAddress::NULL, layout, fields::F_BACK).unwrap(),
        FieldValue::Null
    );
    assert_eq!(
        reader.read_address(RemoteAddress::NULL, ObjectKind::Frame, fields::F_BACK).unwrap(),
        RemoteAddress::NULL
    );
    assert!(matches!(
        reader.read_integer(RemoteAddress::NULL, ObjectKind::Frame, fields::F_LASTI),
        Err(DecodeError::NullObject { .. })
    ));
    assert_eq!(reader.read_text(RemoteAddress::NULL).unwrap(), None);
    assert_eq!(target.image().reads(), 0);
}

#[test]
fn test_unreadable_memory_propagates()
{
    let target = TargetBuilder::new(2, 7, 8);
    let reader = reader(&target);
    let object = RemoteAddress::new(0xdead_0000);

    match reader.read_address(object, ObjectKind::Frame, fields::F_BACK) {
        Err(DecodeError::UnreadableMemory { address, len, context, .. }) => {
            assert_eq!(address, RemoteAddress::new(0xdead_0000 + 24));
            assert_eq!(len, 8);
            assert_eq!(context, "frame.f_back");
        }
        other => panic!("expected UnreadableMemory, got {other:?}"),
    }
}

#[test]
fn test_short_scalar_read_is_truncated_read()
{
    let mut target = TargetBuilder::new(2, 7, 8);
    let lasti = target.layout(ObjectKind::Frame).offset(fields::F_LASTI).unwrap();
    let frame = target.alloc_bytes(lasti + 2);

    let reader = reader(&target);
    match reader.read_integer(frame, ObjectKind::Frame, fields::F_LASTI) {
        Err(error @ DecodeError::TruncatedRead { expected: 4, actual: 2, .. }) => assert!(error.is_memory_error()),
        other => panic!("expected TruncatedRead, got {other:?}"),
    }
}

#[test]
fn test_inline_chars_stop_at_terminator_or_available_bytes()
{
    let version = select(2, 7, 8).unwrap();
    let layout = LayoutBuilder::new(
        ObjectKind::Object,
        VersionRange::single(Release::new(2, 7)),
        PointerWidth::Eight,
        DataModel::Lp64,
    )
    .field("tag", FieldType::Integer(IntWidth::Int))
    .field(
        "label",
        FieldType::InlineChars {
            capacity: 16,
            nul_terminated: true,
        },
    )
    .field(
        "raw",
        FieldType::InlineChars {
            capacity: 8,
            nul_terminated: false,
        },
    )
    .build();

    let mut image = MemoryImage::new();
    let full = RemoteAddress::new(0x1000);
    let mut bytes = vec![0u8; layout.size()];
    bytes[4..9].copy_from_slice(b"hello");
    bytes[20..28].copy_from_slice(b"ab\0cdefg");
    image.map(full, bytes);

    // Only the first three label bytes are mapped.
    let partial = RemoteAddress::new(0x2000);
    image.map(partial, b"\0\0\0\0abc".to_vec());

    let reader = ObjectReader::new(&image, version, DecoderConfig::default());
    assert_eq!(reader.read_field(full, &layout, "label").unwrap(), FieldValue::Chars(b"hello".to_vec()));
    assert_eq!(reader.read_field(full, &layout, "raw").unwrap(), FieldValue::Chars(b"ab\0cdefg".to_vec()));
    assert_eq!(reader.read_field(partial, &layout, "label").unwrap(), FieldValue::Chars(b"abc".to_vec()));
}

#[test]
fn test_read_text_per_family()
{
    let mut py2 = TargetBuilder::new(2, 7, 8);
    let name = py2.text("handler");
    assert_eq!(reader(&py2).read_text(name).unwrap().as_deref(), Some("handler"));

    let mut py3 = TargetBuilder::new(3, 1, 8);
    let name = py3.text("größe");
    assert_eq!(reader(&py3).read_text(name).unwrap().as_deref(), Some("größe"));

    let mut windows = TargetBuilder::with_model(3, 1, 8, DataModel::Llp64);
    let name = windows.text("naïve 🐍");
    assert_eq!(reader(&windows).read_text(name).unwrap().as_deref(), Some("naïve 🐍"));
}

#[test]
fn test_strings_are_clamped_to_max_len()
{
    let mut target = TargetBuilder::new(2, 6, 4);
    let name = target.text("a_rather_long_function_name");
    let config = DecoderConfig::default().with_max_string_len(8);
    let reader = ObjectReader::new(target.image(), target.version, config);
    assert_eq!(reader.read_text(name).unwrap().as_deref(), Some("a_rather"));
}

#[test]
fn test_negative_string_size_is_invalid()
{
    let mut target = TargetBuilder::new(2, 7, 8);
    let name = target.text("x");
    target.set(name, ObjectKind::String, fields::OB_SIZE, -5);
    assert!(matches!(
        reader(&target).read_text(name),
        Err(DecodeError::InvalidObject { .. })
    ));
}

#[test]
fn test_read_byte_string()
{
    let mut target = TargetBuilder::new(3, 0, 8);
    let table = target.byte_string(&[6, 1, 0xff, 2]);
    assert_eq!(reader(&target).read_byte_string(table).unwrap(), Some(vec![6, 1, 0xff, 2]));
}

#[test]
fn test_read_tuple_items()
{
    let mut target = TargetBuilder::new(2, 7, 4);
    let items = [0x1111_0000u64, 0x2222_0000, 0x3333_0000];
    let tuple = target.alloc(ObjectKind::Tuple, items.len() * 4);
    target.set(tuple, ObjectKind::Tuple, fields::OB_SIZE, items.len() as i64);
    let first = target.layout(ObjectKind::Tuple).offset(fields::OB_ITEM).unwrap();
    for (index, item) in items.iter().enumerate() {
        target.write(tuple + (first + index * 4) as u64, &(*item as u32).to_le_bytes());
    }

    let read = reader(&target).read_tuple(tuple).unwrap();
    let read: Vec<u64> = read.into_iter().map(RemoteAddress::value).collect();
    assert_eq!(read, items);
}

#[test]
fn test_read_int_python2()
{
    let mut target = TargetBuilder::new(2, 7, 8);
    let int = target.alloc(ObjectKind::Int, 0);
    target.set(int, ObjectKind::Int, fields::OB_IVAL, -123_456_789_012);
    assert_eq!(reader(&target).read_int(int).unwrap(), -123_456_789_012);
}

fn long_object(target: &mut TargetBuilder, size: i64, digits: &[u32], digit_size: usize) -> RemoteAddress
{
    let long = target.alloc(ObjectKind::Long, digits.len() * digit_size);
    target.set(long, ObjectKind::Long, fields::OB_SIZE, size);
    let first = target.layout(ObjectKind::Long).offset(fields::OB_DIGIT).unwrap();
    for (index, digit) in digits.iter().enumerate() {
        let bytes = digit.to_le_bytes();
        target.write(long + (first + index * digit_size) as u64, &bytes[..digit_size]);
    }
    long
}

#[test]
fn test_read_long_digits()
{
    // 3.1: 30-bit digits. 2**30 + 5 = [5, 1]
    let mut py31 = TargetBuilder::new(3, 1, 8);
    let positive = long_object(&mut py31, 2, &[5, 1], 4);
    let negative = long_object(&mut py31, -1, &[42], 4);
    let zero = long_object(&mut py31, 0, &[], 4);
    let reader31 = reader(&py31);
    assert_eq!(reader31.read_int(positive).unwrap(), (1 << 30) + 5);
    assert_eq!(reader31.read_int(negative).unwrap(), -42);
    assert_eq!(reader31.read_int(zero).unwrap(), 0);

    // 3.0: 15-bit digits. 2**15 * 3 + 7 = [7, 3]
    let mut py30 = TargetBuilder::new(3, 0, 4);
    let value = long_object(&mut py30, 2, &[7, 3], 2);
    assert_eq!(reader(&py30).read_int(value).unwrap(), (3 << 15) + 7);
}

#[test]
fn test_read_long_overflow_is_invalid()
{
    let mut target = TargetBuilder::new(3, 1, 8);
    let huge = long_object(&mut target, 3, &[0, 0, 1 << 29], 4);
    assert!(matches!(
        reader(&target).read_int(huge),
        Err(DecodeError::InvalidObject { .. })
    ));
}

#[test]
fn test_read_long_with_garbage_size_is_invalid()
{
    for (major, minor) in [(3, 0), (3, 1)] {
        let mut target = TargetBuilder::new(major, minor, 8);
        let wide = long_object(&mut target, 1 << 62, &[], 2);
        let negative = long_object(&mut target, i64::MIN, &[], 2);
        let reads = target.image().reads();

        let reader = reader(&target);
        for object in [wide, negative] {
            assert!(matches!(
                reader.read_int(object),
                Err(DecodeError::InvalidObject { .. })
            ));
        }
        // Rejected from ob_size alone; the digits are never requested.
        assert_eq!(target.image().reads(), reads + 2);
    }
}

#[test]
fn test_read_type_and_cfunction_names()
{
    let mut target = TargetBuilder::new(2, 7, 8);

    let type_name = target.alloc_bytes(32);
    target.write(type_name, b"builtin_function_or_method\0");
    let type_object = target.alloc(ObjectKind::Type, 0);
    target.set_ptr(type_object, ObjectKind::Type, fields::TP_NAME, type_name);

    let method_name = target.alloc_bytes(8);
    target.write(method_name, b"sleep\0");
    let method = target.alloc(ObjectKind::MethodDef, 0);
    target.set_ptr(method, ObjectKind::MethodDef, fields::ML_NAME, method_name);

    let function = target.alloc(ObjectKind::CFunction, 0);
    target.set_ptr(function, ObjectKind::CFunction, fields::OB_TYPE, type_object);
    target.set_ptr(function, ObjectKind::CFunction, fields::M_ML, method);

    let reader = reader(&target);
    assert_eq!(
        reader.read_type_name(function).unwrap().as_deref(),
        Some("builtin_function_or_method")
    );
    assert_eq!(reader.read_cfunction_name(function).unwrap().as_deref(), Some("sleep"));
}

#[test]
fn test_c_string_without_terminator_is_cut_at_region_end()
{
    let mut target = TargetBuilder::new(2, 7, 8);
    let name = target.alloc_bytes(4);
    target.write(name, b"abcd");

    let reader = reader(&target);
    assert_eq!(reader.read_c_string(name, 64).unwrap().as_deref(), Some("abcd"));
    assert_eq!(reader.read_c_string(name, 2).unwrap().as_deref(), Some("ab"));
    assert_eq!(reader.read_c_string(RemoteAddress::NULL, 64).unwrap(), None);
}
