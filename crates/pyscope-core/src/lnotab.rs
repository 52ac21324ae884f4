//! # Line Tables
//!
//! Maps a frame's last instruction offset to a source line.
//!
//! Releases 2.4 through 3.1 store `co_lnotab` as a string of byte pairs: an
//! unsigned bytecode address increment followed by an unsigned line
//! increment. [`Lnotab`] decodes that format; callers with a different
//! encoding implement [`LineTable`] themselves.

/// Decoder for a code object's instruction-to-line table.
pub trait LineTable
{
    /// Line executing at bytecode offset `lasti`.
    ///
    /// `table` is the raw table contents and `first_line` is the code
    /// object's `co_firstlineno`.
    fn line_for(&self, table: &[u8], first_line: u32, lasti: u32) -> u32;
}

impl<T: LineTable + ?Sized> LineTable for &T
{
    fn line_for(&self, table: &[u8], first_line: u32, lasti: u32) -> u32
    {
        (**self).line_for(table, first_line, lasti)
    }
}

/// Classic `co_lnotab` decoder
///
/// ```rust
/// use pyscope_core::lnotab::{LineTable, Lnotab};
///
/// // +6 bytes -> +1 line, +8 bytes -> +2 lines
/// let table = [6, 1, 8, 2];
/// assert_eq!(Lnotab.line_for(&table, 10, 0), 10);
/// assert_eq!(Lnotab.line_for(&table, 10, 6), 11);
/// assert_eq!(Lnotab.line_for(&table, 10, 14), 13);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lnotab;

impl LineTable for Lnotab
{
    fn line_for(&self, table: &[u8], first_line: u32, lasti: u32) -> u32
    {
        let mut line = first_line;
        let mut address = 0u32;
        for pair in table.chunks_exact(2) {
            address = address.saturating_add(u32::from(pair[0]));
            if address > lasti {
                break;
            }
            line = line.saturating_add(u32::from(pair[1]));
        }
        line
    }
}
