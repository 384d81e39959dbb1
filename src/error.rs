use std::io;

use crate::gym::Pos;

/// Errors raised while building an environment or moving a Q-table to and from disk
///
/// All of these are configuration problems: a run that hits one cannot continue
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not an .npy file: bad magic string")]
    BadMagic,

    #[error("unsupported .npy format version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("malformed .npy header: {0}")]
    BadHeader(String),

    #[error("unsupported dtype '{0}', expected little-endian float64 ('<f8')")]
    UnsupportedDtype(String),

    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,

    #[error("array shape {found:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("array payload holds {found} bytes, expected {expected}")]
    PayloadSize { expected: usize, found: usize },

    #[error("grid size must be at least 1")]
    EmptyGrid,

    #[error("{what} {pos:?} lies outside the {size}x{size} grid")]
    OutOfBounds {
        what: &'static str,
        pos: Pos,
        size: usize,
    },

    #[error("{what} {pos:?} is an obstacle")]
    Blocked { what: &'static str, pos: Pos },

    #[error("invalid decay schedule: {0}")]
    InvalidDecay(&'static str),
}
