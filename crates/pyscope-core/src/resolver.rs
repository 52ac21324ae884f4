//! # Code/Name Resolver
//!
//! Turns a frame address into a function name, a file name and a line.
//!
//! ## Code object shapes
//!
//! A frame's `f_code` points at one of two code object shapes. Which one is
//! decided by [`InterpreterVersion::code_shape`] when the resolver is built,
//! never by probing target memory; [`CodeObject`] carries the result.
//!
//! ## Line numbers
//!
//! - Trace function active (`f_trace` non-null): `f_lineno` is kept current
//!   by the interpreter and is used as-is.
//! - Otherwise: `co_firstlineno` plus the line table evaluated at `f_lasti`.
//! - `f_lasti < 0` (frame not started) or no line table: `co_firstlineno`.
//!
//! Null name or file objects resolve to [`UNKNOWN`]; a null code object
//! resolves both to [`UNKNOWN`] with the frame's cached line.
//!
//! [`InterpreterVersion::code_shape`]: crate::version::InterpreterVersion::code_shape

use tracing::trace;

use crate::error::Result;
use crate::layout::{fields, ObjectKind};
use crate::lnotab::{LineTable, Lnotab};
use crate::memory::MemoryAccess;
use crate::reader::ObjectReader;
use crate::types::{LineSource, RemoteAddress, UNKNOWN};
use crate::version::CodeShape;

/// Fields common to both code object shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFields
{
    /// Address of the code object.
    pub address: RemoteAddress,
    /// `co_argcount`.
    pub arg_count: i64,
    /// `co_name` (string object).
    pub name: RemoteAddress,
    /// `co_filename` (string object).
    pub filename: RemoteAddress,
    /// `co_firstlineno`.
    pub first_line: i64,
    /// `co_lnotab` (byte string object).
    pub line_table: RemoteAddress,
}

/// A decoded code object, tagged by shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeObject
{
    /// 2.x code object.
    Classic(CodeFields),
    /// 3.x code object.
    KeywordOnly
    {
        /// Shared fields.
        fields: CodeFields,
        /// `co_kwonlyargcount`.
        kw_only_arg_count: i64,
    },
}

impl CodeObject
{
    /// Fields shared by both shapes.
    pub fn fields(&self) -> &CodeFields
    {
        match self {
            CodeObject::Classic(fields) => fields,
            CodeObject::KeywordOnly { fields, .. } => fields,
        }
    }

    /// Shape of this code object.
    pub fn shape(&self) -> CodeShape
    {
        match self {
            CodeObject::Classic(_) => CodeShape::Classic,
            CodeObject::KeywordOnly { .. } => CodeShape::KeywordOnly,
        }
    }

    /// `co_kwonlyargcount`, when the shape has one.
    pub fn kw_only_arg_count(&self) -> Option<i64>
    {
        match self {
            CodeObject::Classic(_) => None,
            CodeObject::KeywordOnly { kw_only_arg_count, .. } => Some(*kw_only_arg_count),
        }
    }
}

/// Function, file and line of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame
{
    /// Function name, or [`UNKNOWN`].
    pub function: String,
    /// Source file, or [`UNKNOWN`].
    pub file: String,
    /// Current line.
    pub line: u32,
    /// How `line` was obtained.
    pub line_source: LineSource,
}

/// Resolves frames to source positions.
pub struct CodeResolver<'a, M: ?Sized, L: ?Sized = Lnotab>
{
    reader: ObjectReader<'a, M>,
    shape: CodeShape,
    line_table: &'a L,
}

static CLASSIC_LNOTAB: Lnotab = Lnotab;

impl<'a, M: MemoryAccess + ?Sized> CodeResolver<'a, M>
{
    /// Resolver using the classic `co_lnotab` decoder.
    pub fn new(reader: ObjectReader<'a, M>) -> Self
    {
        Self::with_line_table(reader, &CLASSIC_LNOTAB)
    }
}

impl<'a, M: MemoryAccess + ?Sized, L: LineTable + ?Sized> CodeResolver<'a, M, L>
{
    /// Resolver using a caller supplied line table decoder.
    pub fn with_line_table(reader: ObjectReader<'a, M>, line_table: &'a L) -> Self
    {
        Self {
            shape: reader.version().code_shape(),
            reader,
            line_table,
        }
    }

    /// Reader the resolver decodes through.
    pub fn reader(&self) -> &ObjectReader<'a, M>
    {
        &self.reader
    }

    /// Decode the code object at `address` in this version's shape.
    pub fn read_code(&self, address: RemoteAddress) -> Result<CodeObject>
    {
        let read_ptr = |field: &str| self.reader.read_address(address, ObjectKind::Code, field);
        let read_int = |field: &str| self.reader.read_integer(address, ObjectKind::Code, field);

        let shared = CodeFields {
            address,
            arg_count: read_int(fields::CO_ARGCOUNT)?,
            name: read_ptr(fields::CO_NAME)?,
            filename: read_ptr(fields::CO_FILENAME)?,
            first_line: read_int(fields::CO_FIRSTLINENO)?,
            line_table: read_ptr(fields::CO_LNOTAB)?,
        };

        Ok(match self.shape {
            CodeShape::Classic => CodeObject::Classic(shared),
            CodeShape::KeywordOnly => CodeObject::KeywordOnly {
                fields: shared,
                kw_only_arg_count: read_int(fields::CO_KWONLYARGCOUNT)?,
            },
        })
    }

    /// Resolve the frame at `frame`
    ///
    /// ## Errors
    ///
    /// Memory errors propagate; null names do not.
    pub fn resolve(&self, frame: RemoteAddress) -> Result<ResolvedFrame>
    {
        let code = self.reader.read_address(frame, ObjectKind::Frame, fields::F_CODE)?;
        if code.is_null() {
            let line = self.reader.read_integer(frame, ObjectKind::Frame, fields::F_LINENO)?;
            return Ok(ResolvedFrame {
                function: UNKNOWN.to_string(),
                file: UNKNOWN.to_string(),
                line: clamp_line(line),
                line_source: LineSource::Unknown,
            });
        }

        let code = self.read_code(code)?;
        let shared = code.fields();
        let function = self.text_or_unknown(shared.name)?;
        let file = self.text_or_unknown(shared.filename)?;
        let (line, line_source) = self.current_line(frame, shared)?;

        trace!("frame {frame}: {function} ({file}:{line}, {line_source:?})");
        Ok(ResolvedFrame {
            function,
            file,
            line,
            line_source,
        })
    }

    fn current_line(&self, frame: RemoteAddress, code: &CodeFields) -> Result<(u32, LineSource)>
    {
        let tracer = self.reader.read_address(frame, ObjectKind::Frame, fields::F_TRACE)?;
        if !tracer.is_null() {
            let line = self.reader.read_integer(frame, ObjectKind::Frame, fields::F_LINENO)?;
            return Ok((clamp_line(line), LineSource::Traced));
        }

        let first_line = clamp_line(code.first_line);
        let lasti = self.reader.read_integer(frame, ObjectKind::Frame, fields::F_LASTI)?;
        let Ok(lasti) = u32::try_from(lasti) else {
            return Ok((first_line, LineSource::FirstLine));
        };

        match self.reader.read_byte_string(code.line_table)? {
            Some(table) => Ok((self.line_table.line_for(&table, first_line, lasti), LineSource::LineTable)),
            None => Ok((first_line, LineSource::FirstLine)),
        }
    }

    fn text_or_unknown(&self, object: RemoteAddress) -> Result<String>
    {
        Ok(self
            .reader
            .read_text(object)?
            .unwrap_or_else(|| UNKNOWN.to_string()))
    }
}

fn clamp_line(line: i64) -> u32
{
    u32::try_from(line.max(0)).unwrap_or(u32::MAX)
}
