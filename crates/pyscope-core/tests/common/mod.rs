//! Builds synthetic interpreter memory for tests.
//!
//! Every object goes into its own mapped region, separated from its
//! neighbours by an unmapped gap, so a test can unmap one object to simulate
//! a failed read without disturbing the rest.

#![allow(dead_code)]

use pyscope_core::layout::{fields, layout_for, ObjectKind, ObjectLayout};
use pyscope_core::memory::MemoryImage;
use pyscope_core::types::RemoteAddress;
use pyscope_core::version::{select_with_model, DataModel, InterpreterVersion, ReleaseFamily};

const BASE: u64 = 0x0010_0000;
const GAP: u64 = 0x100;

pub struct TargetBuilder
{
    pub version: InterpreterVersion,
    image: MemoryImage,
    cursor: u64,
}

impl TargetBuilder
{
    pub fn new(major: u8, minor: u8, width: usize) -> Self
    {
        Self::with_model(major, minor, width, DataModel::Lp64)
    }

    pub fn with_model(major: u8, minor: u8, width: usize, model: DataModel) -> Self
    {
        let version = select_with_model(major, minor, width, model).unwrap();
        Self {
            version,
            image: MemoryImage::new(),
            cursor: BASE,
        }
    }

    pub fn layout(&self, kind: ObjectKind) -> &'static ObjectLayout
    {
        layout_for(kind, &self.version).unwrap()
    }

    pub fn image(&self) -> &MemoryImage
    {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut MemoryImage
    {
        &mut self.image
    }

    /// Map `len` zero bytes in a fresh region.
    pub fn alloc_bytes(&mut self, len: usize) -> RemoteAddress
    {
        let address = RemoteAddress::new(self.cursor);
        self.image.map_zeroed(address, len.max(1));
        self.cursor += (len as u64).div_ceil(GAP) * GAP + GAP;
        address
    }

    /// Map a zeroed object of `kind` with `extra` trailing bytes.
    pub fn alloc(&mut self, kind: ObjectKind, extra: usize) -> RemoteAddress
    {
        let size = self.layout(kind).size() + extra;
        self.alloc_bytes(size)
    }

    /// Write `value` into `field`, truncated to the field's size.
    pub fn set(&mut self, object: RemoteAddress, kind: ObjectKind, field: &str, value: i64)
    {
        let field = *self.layout(kind).field(field).unwrap();
        let bytes = value.to_le_bytes();
        self.image.write(object + field.offset as u64, &bytes[..field.size]).unwrap();
    }

    pub fn set_ptr(&mut self, object: RemoteAddress, kind: ObjectKind, field: &str, value: RemoteAddress)
    {
        self.set(object, kind, field, value.value() as i64);
    }

    pub fn write(&mut self, at: RemoteAddress, bytes: &[u8])
    {
        self.image.write(at, bytes).unwrap();
    }

    pub fn unmap(&mut self, object: RemoteAddress)
    {
        self.image.unmap(object).unwrap();
    }

    /// `str`/`bytes` style object holding `bytes`.
    pub fn sized_chars(&mut self, kind: ObjectKind, bytes: &[u8]) -> RemoteAddress
    {
        let object = self.alloc(kind, bytes.len() + 1);
        self.set(object, kind, fields::OB_SIZE, bytes.len() as i64);
        let sval = self.layout(kind).offset(fields::OB_SVAL).unwrap();
        self.write(object + sval as u64, bytes);
        object
    }

    pub fn unicode(&mut self, text: &str) -> RemoteAddress
    {
        let units: Vec<u8> = match self.version.data_model {
            DataModel::Lp64 => text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
            DataModel::Llp64 => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        };
        let buffer = self.alloc_bytes(units.len());
        self.write(buffer, &units);

        let object = self.alloc(ObjectKind::Unicode, 0);
        let length = units.len() / self.version.data_model.unicode_unit_size();
        self.set(object, ObjectKind::Unicode, fields::UNICODE_LENGTH, length as i64);
        self.set_ptr(object, ObjectKind::Unicode, fields::UNICODE_STR, buffer);
        object
    }

    /// Name or file string in this version's text type.
    pub fn text(&mut self, text: &str) -> RemoteAddress
    {
        match self.version.family {
            ReleaseFamily::Python2 => self.sized_chars(ObjectKind::String, text.as_bytes()),
            ReleaseFamily::Python3 => self.unicode(text),
        }
    }

    /// Line table in this version's byte string type.
    pub fn byte_string(&mut self, bytes: &[u8]) -> RemoteAddress
    {
        let kind = self.version.line_table_kind();
        self.sized_chars(kind, bytes)
    }

    pub fn code(&mut self, name: Option<&str>, file: Option<&str>, first_line: i64, lnotab: &[u8]) -> RemoteAddress
    {
        let name = name.map(|name| self.text(name)).unwrap_or(RemoteAddress::NULL);
        let file = file.map(|file| self.text(file)).unwrap_or(RemoteAddress::NULL);
        let table = self.byte_string(lnotab);

        let code = self.alloc(ObjectKind::Code, 0);
        self.set_ptr(code, ObjectKind::Code, fields::CO_NAME, name);
        self.set_ptr(code, ObjectKind::Code, fields::CO_FILENAME, file);
        self.set(code, ObjectKind::Code, fields::CO_FIRSTLINENO, first_line);
        self.set_ptr(code, ObjectKind::Code, fields::CO_LNOTAB, table);
        code
    }

    pub fn frame(&mut self, code: RemoteAddress, back: RemoteAddress, lasti: i64, lineno: i64) -> RemoteAddress
    {
        let frame = self.alloc(ObjectKind::Frame, 0);
        self.set_ptr(frame, ObjectKind::Frame, fields::F_BACK, back);
        self.set_ptr(frame, ObjectKind::Frame, fields::F_CODE, code);
        self.set(frame, ObjectKind::Frame, fields::F_LASTI, lasti);
        self.set(frame, ObjectKind::Frame, fields::F_LINENO, lineno);
        frame
    }

    /// A chain of `count` frames running `func0`..`funcN` in `mod.py`,
    /// returned innermost first. Frame `i` is at line `10 * (i + 1)`.
    pub fn frame_chain(&mut self, count: usize) -> Vec<RemoteAddress>
    {
        let mut back = RemoteAddress::NULL;
        let mut frames = Vec::with_capacity(count);
        for index in (0..count).rev() {
            let name = format!("func{index}");
            let code = self.code(Some(&name), Some("mod.py"), 10 * (index as i64 + 1), &[]);
            back = self.frame(code, back, 0, 0);
            frames.push(back);
        }
        frames.reverse();
        frames
    }

    pub fn thread_state(&mut self, frame: RemoteAddress, next: RemoteAddress, thread_id: i64) -> RemoteAddress
    {
        let state = self.alloc(ObjectKind::ThreadState, 0);
        self.set_ptr(state, ObjectKind::ThreadState, fields::TS_FRAME, frame);
        self.set_ptr(state, ObjectKind::ThreadState, fields::TS_NEXT, next);
        self.set(state, ObjectKind::ThreadState, fields::TS_THREAD_ID, thread_id);
        state
    }
}
