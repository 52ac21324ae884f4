//! # Decoder Configuration
//!
//! Bounds that keep a walk over corrupted or racing target memory finite.
//!
//! ## Environment Variables
//!
//! - `PYSCOPE_MAX_DEPTH`: frames per thread before the walk is cut off (default: 256)
//! - `PYSCOPE_MAX_STRING_LEN`: bytes read for one name or file string (default: 4096)
//! - `PYSCOPE_MAX_TUPLE_ITEMS`: items read from one tuple (default: 1024)
//! - `PYSCOPE_MAX_THREADS`: thread states followed from the list head (default: 512)
//!
//! Invalid values are ignored with a warning and the default is kept.

use std::env;
use std::str::FromStr;

/// Limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig
{
    /// Maximum frames decoded per thread.
    pub max_depth: usize,
    /// Maximum bytes decoded from one string object.
    pub max_string_len: usize,
    /// Maximum items read from one tuple.
    pub max_tuple_items: usize,
    /// Maximum thread states followed from the list head.
    pub max_threads: usize,
}

impl Default for DecoderConfig
{
    fn default() -> Self
    {
        Self {
            max_depth: 256,
            max_string_len: 4096,
            max_tuple_items: 1024,
            max_threads: 512,
        }
    }
}

impl DecoderConfig
{
    /// Defaults overridden by any `PYSCOPE_*` variables that are set.
    pub fn from_env() -> Self
    {
        let defaults = Self::default();
        Self {
            max_depth: env_or("PYSCOPE_MAX_DEPTH", defaults.max_depth),
            max_string_len: env_or("PYSCOPE_MAX_STRING_LEN", defaults.max_string_len),
            max_tuple_items: env_or("PYSCOPE_MAX_TUPLE_ITEMS", defaults.max_tuple_items),
            max_threads: env_or("PYSCOPE_MAX_THREADS", defaults.max_threads),
        }
    }

    /// Replace the frame depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self
    {
        self.max_depth = max_depth;
        self
    }

    /// Replace the string length limit.
    pub fn with_max_string_len(mut self, max_string_len: usize) -> Self
    {
        self.max_string_len = max_string_len;
        self
    }
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(name) {
        Ok(raw) => parse_or(name, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T>(name: &str, raw: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("ignoring invalid {name}={raw:?}, keeping default");
        default
    })
}
