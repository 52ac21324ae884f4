//! # Remote Object Reader
//!
//! Decodes interpreter objects out of target memory using the selected layouts.
//!
//! Every field read is exactly one bounded call to
//! [`MemoryAccess::read`] at `object + offset`. Nothing is cached between
//! calls: the target keeps running, and a cached value would be stale by the
//! next sample.
//!
//! ## Null and unreadable are different things
//!
//! A null object address is a defined terminal and never touches memory:
//! [`ObjectReader::read_field`] returns [`FieldValue::Null`], pointer helpers
//! return [`RemoteAddress::NULL`] and text helpers return `None`. A read that
//! fails is always an error (`UnreadableMemory`, or `TruncatedRead` for a
//! short scalar), never a zero.
//!
//! Character data is the exception to the strict length rule: a string read
//! that comes back short is truncated rather than rejected, since a partially
//! readable name is still useful.

use tracing::trace;

use crate::config::DecoderConfig;
use crate::error::{DecodeError, Result};
use crate::layout::{fields, FieldLayout, FieldType, ItemKind, LayoutCatalog, ObjectKind, ObjectLayout};
use crate::memory::MemoryAccess;
use crate::types::RemoteAddress;
use crate::version::{InterpreterVersion, ReleaseFamily};

/// Decoded value of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue
{
    /// The object address was null; nothing was read.
    Null,
    /// Sign-extended integer.
    Integer(i64),
    /// Pointer value.
    Address(RemoteAddress),
    /// Inline characters, cut at the terminator or at the bytes available.
    Chars(Vec<u8>),
    /// Raw bytes of an inline struct.
    Bytes(Vec<u8>),
    /// Location of the first element of a trailing array; nothing was read.
    Items(RemoteAddress),
}

impl FieldValue
{
    /// The integer, if this is an integer field.
    pub fn as_integer(&self) -> Option<i64>
    {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The pointer, if this is a pointer field.
    pub fn as_address(&self) -> Option<RemoteAddress>
    {
        match self {
            FieldValue::Address(address) | FieldValue::Items(address) => Some(*address),
            _ => None,
        }
    }
}

/// Reads typed values out of one target's memory.
///
/// The reader borrows the memory capability and the catalog; it owns no
/// remote state and can be created per sample.
pub struct ObjectReader<'a, M: ?Sized>
{
    memory: &'a M,
    version: InterpreterVersion,
    catalog: &'a LayoutCatalog,
    config: DecoderConfig,
}

impl<M: ?Sized> Clone for ObjectReader<'_, M>
{
    fn clone(&self) -> Self
    {
        *self
    }
}

impl<M: ?Sized> Copy for ObjectReader<'_, M> {}

impl<'a, M: MemoryAccess + ?Sized> ObjectReader<'a, M>
{
    /// Reader over the built-in catalog.
    pub fn new(memory: &'a M, version: InterpreterVersion, config: DecoderConfig) -> Self
    {
        Self::with_catalog(memory, version, LayoutCatalog::builtin(), config)
    }

    /// Reader over an explicit catalog.
    pub fn with_catalog(
        memory: &'a M,
        version: InterpreterVersion,
        catalog: &'a LayoutCatalog,
        config: DecoderConfig,
    ) -> Self
    {
        Self {
            memory,
            version,
            catalog,
            config,
        }
    }

    /// Version every layout is selected for.
    pub fn version(&self) -> &InterpreterVersion
    {
        &self.version
    }

    /// Active limits.
    pub fn config(&self) -> &DecoderConfig
    {
        &self.config
    }

    /// Layout of `kind` for this reader's version.
    pub fn layout(&self, kind: ObjectKind) -> Result<&'a ObjectLayout>
    {
        self.catalog.layout_for(kind, &self.version)
    }

    /// Read one field of the object at `address`
    ///
    /// ## Errors
    ///
    /// - `UnknownField`: the layout does not declare `field`
    /// - `UnreadableMemory`: the memory capability failed
    /// - `TruncatedRead`: a scalar or struct came back short
    pub fn read_field(&self, address: RemoteAddress, layout: &ObjectLayout, field: &str) -> Result<FieldValue>
    {
        if address.is_null() {
            return Ok(FieldValue::Null);
        }

        let field = layout.field(field)?;
        let at = field_address(address, field)?;
        let kind = layout.kind();
        trace!("reading {kind}.{} at {at}", field.name);

        match field.ty {
            FieldType::Integer(_) => {
                let bytes = self.read_exact(at, field.size, kind, field.name)?;
                Ok(FieldValue::Integer(decode_signed(&bytes)))
            }
            FieldType::Address => {
                let bytes = self.read_exact(at, field.size, kind, field.name)?;
                Ok(FieldValue::Address(RemoteAddress::new(decode_unsigned(&bytes))))
            }
            FieldType::InlineChars {
                capacity,
                nul_terminated,
            } => {
                let mut bytes = self.read_available(at, capacity, kind, field.name)?;
                if nul_terminated {
                    if let Some(end) = bytes.iter().position(|byte| *byte == 0) {
                        bytes.truncate(end);
                    }
                }
                Ok(FieldValue::Chars(bytes))
            }
            FieldType::Struct { size, .. } => Ok(FieldValue::Bytes(self.read_exact(at, size, kind, field.name)?)),
            FieldType::Items(_) => Ok(FieldValue::Items(at)),
        }
    }

    /// Read a pointer field; a null object yields [`RemoteAddress::NULL`].
    pub fn read_address(&self, object: RemoteAddress, kind: ObjectKind, field: &str) -> Result<RemoteAddress>
    {
        let layout = self.layout(kind)?;
        match self.read_field(object, layout, field)? {
            FieldValue::Null => Ok(RemoteAddress::NULL),
            value => value.as_address().ok_or_else(|| wrong_type(kind, field, "pointer")),
        }
    }

    /// Read an integer field.
    ///
    /// ## Errors
    ///
    /// `NullObject` if `object` is null: there is no integer to report.
    pub fn read_integer(&self, object: RemoteAddress, kind: ObjectKind, field: &str) -> Result<i64>
    {
        let layout = self.layout(kind)?;
        match self.read_field(object, layout, field)? {
            FieldValue::Null => Err(DecodeError::NullObject {
                context: format!("{kind}.{field}"),
            }),
            value => value.as_integer().ok_or_else(|| wrong_type(kind, field, "integer")),
        }
    }

    /// Decode a name or file string for this version (`str` on 2.x, `unicode` on 3.x).
    ///
    /// Returns `None` for a null object.
    pub fn read_text(&self, object: RemoteAddress) -> Result<Option<String>>
    {
        match self.version.text_kind() {
            ObjectKind::Unicode => self.read_unicode(object),
            kind => Ok(self
                .read_sized_chars(object, kind)?
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())),
        }
    }

    /// Raw contents of a byte string (`str` on 2.x, `bytes` on 3.x).
    pub fn read_byte_string(&self, object: RemoteAddress) -> Result<Option<Vec<u8>>>
    {
        self.read_sized_chars(object, self.version.line_table_kind())
    }

    /// Decode a `PyUnicodeObject`.
    pub fn read_unicode(&self, object: RemoteAddress) -> Result<Option<String>>
    {
        if object.is_null() {
            return Ok(None);
        }

        let length = self.read_integer(object, ObjectKind::Unicode, fields::UNICODE_LENGTH)?;
        let units = self.checked_count(object, length, self.config.max_string_len)?;
        let buffer = self.read_address(object, ObjectKind::Unicode, fields::UNICODE_STR)?;
        if buffer.is_null() || units == 0 {
            return Ok(Some(String::new()));
        }

        let unit = self.version.data_model.unicode_unit_size();
        let bytes = self.read_available(buffer, units * unit, ObjectKind::Unicode, fields::UNICODE_STR)?;
        Ok(Some(decode_units(&bytes, unit)))
    }

    /// Read a NUL-terminated C string of at most `max_len` bytes.
    ///
    /// The string is cut at the first NUL, or at `max_len`, or at the end of
    /// the readable bytes, whichever comes first.
    pub fn read_c_string(&self, address: RemoteAddress, max_len: usize) -> Result<Option<String>>
    {
        if address.is_null() {
            return Ok(None);
        }

        let mut bytes = self.memory.read(address, max_len).map_err(|source| DecodeError::UnreadableMemory {
            address,
            len: max_len,
            context: "C string".to_string(),
            source,
        })?;
        if let Some(end) = bytes.iter().position(|byte| *byte == 0) {
            bytes.truncate(end);
        }
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Item addresses of a tuple, at most `max_tuple_items` of them.
    pub fn read_tuple(&self, object: RemoteAddress) -> Result<Vec<RemoteAddress>>
    {
        if object.is_null() {
            return Ok(Vec::new());
        }

        let size = self.read_integer(object, ObjectKind::Tuple, fields::OB_SIZE)?;
        let count = self.checked_count(object, size, self.config.max_tuple_items)?;
        let layout = self.layout(ObjectKind::Tuple)?;
        let items = self.items_address(object, layout, fields::OB_ITEM)?;

        let word = self.version.word_size();
        let bytes = self.read_available(items, count * word, ObjectKind::Tuple, fields::OB_ITEM)?;
        Ok(bytes
            .chunks_exact(word)
            .map(|chunk| RemoteAddress::new(decode_unsigned(chunk)))
            .collect())
    }

    /// Value of a small integer object (`int` on 2.x, `int`/`long` on 3.x).
    ///
    /// ## Errors
    ///
    /// `InvalidObject` if the value does not fit in an `i64`.
    pub fn read_int(&self, object: RemoteAddress) -> Result<i64>
    {
        match self.version.family {
            ReleaseFamily::Python2 => self.read_integer(object, ObjectKind::Int, fields::OB_IVAL),
            ReleaseFamily::Python3 => self.read_long(object),
        }
    }

    fn read_long(&self, object: RemoteAddress) -> Result<i64>
    {
        let size = self.read_integer(object, ObjectKind::Long, fields::OB_SIZE)?;
        let layout = self.layout(ObjectKind::Long)?;
        let digit_field = layout.field(fields::OB_DIGIT)?;
        let (digit_bits, digit_size) = match digit_field.ty {
            FieldType::Items(ItemKind::Digit15) => (15u32, 2usize),
            _ => (30u32, 4usize),
        };

        let count = size.unsigned_abs();
        if count == 0 {
            return Ok(0);
        }
        if count > u64::from(126 / digit_bits) {
            return Err(DecodeError::InvalidObject {
                address: object,
                reason: format!("integer with {count} digits does not fit in 64 bits"),
            });
        }

        let count = count as usize;
        let at = field_address(object, digit_field)?;
        let bytes = self.read_exact(at, count * digit_size, ObjectKind::Long, fields::OB_DIGIT)?;
        let magnitude = bytes
            .chunks_exact(digit_size)
            .rev()
            .fold(0i128, |acc, digit| (acc << digit_bits) | decode_unsigned(digit) as i128);
        let value = if size < 0 { -magnitude } else { magnitude };

        i64::try_from(value).map_err(|_| DecodeError::InvalidObject {
            address: object,
            reason: format!("integer {value} does not fit in 64 bits"),
        })
    }

    /// `tp_name` of the object's type.
    pub fn read_type_name(&self, object: RemoteAddress) -> Result<Option<String>>
    {
        let type_object = self.read_address(object, ObjectKind::Object, fields::OB_TYPE)?;
        let name = self.read_address(type_object, ObjectKind::Type, fields::TP_NAME)?;
        self.read_c_string(name, self.config.max_string_len)
    }

    /// `ml_name` of a builtin function object.
    pub fn read_cfunction_name(&self, object: RemoteAddress) -> Result<Option<String>>
    {
        let method = self.read_address(object, ObjectKind::CFunction, fields::M_ML)?;
        let name = self.read_address(method, ObjectKind::MethodDef, fields::ML_NAME)?;
        self.read_c_string(name, self.config.max_string_len)
    }

    /// Characters of a `str`/`bytes` object whose length lives in `ob_size`.
    fn read_sized_chars(&self, object: RemoteAddress, kind: ObjectKind) -> Result<Option<Vec<u8>>>
    {
        if object.is_null() {
            return Ok(None);
        }

        let size = self.read_integer(object, kind, fields::OB_SIZE)?;
        let len = self.checked_count(object, size, self.config.max_string_len)?;
        let layout = self.layout(kind)?;
        let chars = self.items_address(object, layout, fields::OB_SVAL)?;
        if len == 0 {
            return Ok(Some(Vec::new()));
        }
        self.read_available(chars, len, kind, fields::OB_SVAL).map(Some)
    }

    fn items_address(&self, object: RemoteAddress, layout: &ObjectLayout, field: &str) -> Result<RemoteAddress>
    {
        match self.read_field(object, layout, field)? {
            FieldValue::Items(at) => Ok(at),
            _ => Err(wrong_type(layout.kind(), field, "trailing array")),
        }
    }

    /// Validate a length or item count read from the target and clamp it.
    fn checked_count(&self, object: RemoteAddress, raw: i64, limit: usize) -> Result<usize>
    {
        let count = usize::try_from(raw).map_err(|_| DecodeError::InvalidObject {
            address: object,
            reason: format!("negative length {raw}"),
        })?;
        if count > limit {
            trace!("clamping length {count} of object at {object} to {limit}");
        }
        Ok(count.min(limit))
    }

    /// One read that must return exactly `len` bytes.
    fn read_exact(&self, at: RemoteAddress, len: usize, kind: ObjectKind, field: &str) -> Result<Vec<u8>>
    {
        let bytes = self.read_available(at, len, kind, field)?;
        if bytes.len() < len {
            return Err(DecodeError::TruncatedRead {
                address: at,
                expected: len,
                actual: bytes.len(),
                context: format!("{kind}.{field}"),
            });
        }
        Ok(bytes)
    }

    /// One read that may come back short.
    fn read_available(&self, at: RemoteAddress, len: usize, kind: ObjectKind, field: &str) -> Result<Vec<u8>>
    {
        self.memory.read(at, len).map_err(|source| DecodeError::UnreadableMemory {
            address: at,
            len,
            context: format!("{kind}.{field}"),
            source,
        })
    }
}

fn field_address(object: RemoteAddress, field: &FieldLayout) -> Result<RemoteAddress>
{
    object
        .checked_add(field.offset as u64)
        .ok_or_else(|| DecodeError::InvalidObject {
            address: object,
            reason: format!("field {} overflows the address space", field.name),
        })
}

fn wrong_type(kind: ObjectKind, field: &str, expected: &str) -> DecodeError
{
    DecodeError::UnknownField {
        kind,
        field: format!("{field} (not a {expected} field)"),
    }
}

/// Little-endian unsigned value of up to eight bytes.
pub(crate) fn decode_unsigned(bytes: &[u8]) -> u64
{
    bytes.iter().rev().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// Little-endian two's complement value of up to eight bytes, sign-extended.
pub(crate) fn decode_signed(bytes: &[u8]) -> i64
{
    let raw = decode_unsigned(bytes);
    let bits = bytes.len() * 8;
    if bits == 0 || bits >= 64 {
        return raw as i64;
    }
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

/// Decode `Py_UNICODE` units; a trailing partial unit is dropped.
fn decode_units(bytes: &[u8], unit: usize) -> String
{
    if unit == 2 {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let code = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect()
    }
}
