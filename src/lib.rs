//! A DEFLATE (RFC 1951) decoder and the PNG (RFC 2083) image decoder built
//! on top of it.
//!
//! Two entry points, boundary-exact with the design this crate implements:
//! [`inflate`] decodes a raw DEFLATE stream into a caller-sized buffer;
//! [`decode_png`] decodes a complete PNG file into RGBA, with
//! [`get_png_size`] as the sibling query a caller uses to size that buffer.
//!
//! Out of scope: GZIP framing, BMP, PNG encoding, interlaced (Adam7) PNGs,
//! greyscale/greyscale+alpha color types, non-8-bit channel depths, and any
//! streaming/incremental decode API. See `SPEC_FULL.md` for the full
//! rationale and the ambient stack (logging, error handling, configuration,
//! test tooling) this crate carries around the core algorithms.

pub mod bitstream;
pub mod deflate;
pub mod error;
pub mod huffman;
pub mod png;

pub use deflate::{inflate, InflateScratch};
pub use error::{ErrorKind, Fatal};
pub use png::{decode_png, get_png_size, PngScratch};
