use std::fmt::{self, Display, Formatter};

/// The result type returned by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while parsing or rendering an XCF buffer.
#[derive(Debug)]
pub enum Error {
    /// The magic bytes didn't match `"gimp xcf "`, or the version string was
    /// structurally incompatible.
    UnsupportedFormat,
    /// The image declares a precision code outside the twelve known values.
    UnsupportedPrecision(u32),
    /// A read went past the end of the buffer.
    ShortBuffer,
    /// A property's declared length is impossible, or its payload
    /// self-contradicts its type.
    MalformedProperty(&'static str),
    /// A tile's RLE stream over/under-ran its channel, or its channel count
    /// is inconsistent with the owning layer's type.
    MalformedTile(&'static str),
    /// A pointer read from the buffer falls outside it, or following it
    /// would re-enter a node already on the current traversal path.
    InvalidPointer(u64),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Error as E;

        match self {
            E::UnsupportedFormat => write!(f, "not a recognized XCF buffer"),
            E::UnsupportedPrecision(code) => write!(f, "unsupported precision code '{code}'"),
            E::ShortBuffer => write!(f, "read past the end of the buffer"),
            E::MalformedProperty(msg) => write!(f, "malformed property: {msg}"),
            E::MalformedTile(msg) => write!(f, "malformed tile: {msg}"),
            E::InvalidPointer(offset) => write!(f, "invalid pointer '{offset:#x}'"),
        }
    }
}

impl std::error::Error for Error {}
