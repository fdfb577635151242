//! PNG image decoder (RFC 2083), built on the DEFLATE engine.
//!
//! Non-goals carried from spec.md: no interlacing (Adam7), no
//! greyscale/greyscale+alpha color types, no non-8-bit channel depths, no
//! incremental decode.

pub mod adler32;
pub mod chunks;
pub mod crc32;
pub mod filter;

use crate::deflate::{self, InflateScratch};
use crate::error::{ErrorKind, Fatal};
use crate::safety_check;
use chunks::{ColorType, Ihdr};

/// Reusable working memory for one `decode_png` call: an embedded
/// `InflateScratch` plus the filtered-scanline buffer, sized exactly to
/// `height * (1 + width * bpc)` per spec's Design Notes (replacing the
/// source's 50 MB static over-allocation).
pub struct PngScratch {
    inflate: InflateScratch,
    filtered: Vec<u8>,
}

impl PngScratch {
    pub fn new() -> Self {
        Self {
            inflate: InflateScratch::new(),
            filtered: Vec::new(),
        }
    }
}

impl Default for PngScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse only enough of `compressed` (signature + IHDR) to learn the image
/// dimensions, per spec §6.2's sibling query.
pub fn get_png_size(compressed: &[u8]) -> Result<(u32, u32), Fatal> {
    let ihdr = chunks::parse_header_only(compressed)?;
    Ok((ihdr.width, ihdr.height))
}

/// Decode a complete PNG file into `output`, which must be exactly
/// `width * height * 4` bytes (spec §6.2).
pub fn decode_png(compressed: &[u8], output: &mut [u8], scratch: &mut PngScratch) -> Result<(), Fatal> {
    let parsed = chunks::parse(compressed)?;
    let Ihdr {
        width,
        height,
        color_type,
        ..
    } = parsed.ihdr;
    let (width, height) = (width as usize, height as usize);

    safety_check!(
        output.len() == width * height * 4,
        ErrorKind::OutputOverflow
    );
    if color_type == ColorType::Indexed {
        safety_check!(parsed.palette.is_some(), ErrorKind::ChunkOrderViolation);
    }

    let body = chunks::split_zlib_stream(&parsed.zlib_stream)?;

    let bpc = color_type.bytes_per_pixel();
    let stride = width * bpc;
    let scanline_stream_len = height * (1 + stride);

    scratch.filtered.clear();
    scratch.filtered.resize(scanline_stream_len, 0);

    let written = deflate::inflate(&mut scratch.filtered, &mut scratch.inflate, body)?;
    safety_check!(written == scanline_stream_len, ErrorKind::OutputOverflow);

    // RFC 1950's Adler-32 trailer covers the *uncompressed* stream DEFLATE
    // produced, not the compressed bytes fed into it, so this must run
    // against `scratch.filtered` after inflate and before filter
    // reconstruction mutates it in place.
    #[cfg(feature = "verify-adler32")]
    {
        let trailer = &parsed.zlib_stream[parsed.zlib_stream.len() - 4..];
        let stored = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = adler32::adler32(&scratch.filtered[..written]);
        safety_check!(computed == stored, ErrorKind::CrcMismatch);
    }

    filter::undo_filters(&mut scratch.filtered, height, stride, bpc)?;

    let palette_entries = parsed.palette.as_ref().map(|p| p.entries.as_slice());
    let record_len = 1 + stride;
    for row in 0..height {
        let data_start = row * record_len + 1;
        let src = &scratch.filtered[data_start..data_start + stride];
        let dst = &mut output[row * width * 4..(row + 1) * width * 4];
        filter::expand_scanline_to_rgba(src, width, bpc, palette_entries, dst)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::crc32::crc32_chunk;

    fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend((data.len() as u32).to_be_bytes());
        out.extend(chunk_type);
        out.extend(data);
        out.extend(crc32_chunk(chunk_type, data).to_be_bytes());
        out
    }

    fn ihdr_data(width: u32, height: u32, color_type: u8) -> Vec<u8> {
        let mut d = Vec::new();
        d.extend(width.to_be_bytes());
        d.extend(height.to_be_bytes());
        d.push(8); // bit depth
        d.push(color_type);
        d.push(0); // compression
        d.push(0); // filter
        d.push(0); // interlace
        d
    }

    /// Build a minimal zlib stream (header + stored-block DEFLATE body +
    /// trailer Adler-32) around `raw`.
    fn zlib_wrap(raw: &[u8]) -> Vec<u8> {
        let mut out = vec![0x78, 0x01];
        // One stored DEFLATE block, BFINAL=1, BTYPE=00.
        out.push(0x01);
        let len = raw.len() as u16;
        out.extend(len.to_le_bytes());
        out.extend((!len).to_le_bytes());
        out.extend(raw);
        out.extend(crate::png::adler32::adler32(raw).to_be_bytes());
        out
    }

    fn png_file(ihdr: Vec<u8>, palette: Option<Vec<u8>>, idat_raw: &[u8]) -> Vec<u8> {
        let mut out = chunks::SIGNATURE.to_vec();
        out.extend(chunk(b"IHDR", &ihdr));
        if let Some(plte) = palette {
            out.extend(chunk(b"PLTE", &plte));
        }
        out.extend(chunk(b"IDAT", &zlib_wrap(idat_raw)));
        out.extend(chunk(b"IEND", &[]));
        out
    }

    #[test]
    fn one_by_one_rgba_opaque_red() {
        let ihdr = ihdr_data(1, 1, 6);
        let raw_scanlines = [0u8, 0xFF, 0x00, 0x00, 0xFF]; // filter(0), R,G,B,A
        let file = png_file(ihdr, None, &raw_scanlines);

        let (w, h) = get_png_size(&file).unwrap();
        assert_eq!((w, h), (1, 1));

        let mut output = [0u8; 4];
        let mut scratch = PngScratch::new();
        decode_png(&file, &mut output, &mut scratch).unwrap();
        assert_eq!(output, [0xFF, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn two_by_one_indexed() {
        let ihdr = ihdr_data(2, 1, 3);
        let palette = vec![10u8, 20, 30, 40, 50, 60];
        let raw_scanlines = [0u8, 0x00, 0x01]; // filter(0), idx0, idx1
        let file = png_file(ihdr, Some(palette), &raw_scanlines);

        let mut output = [0u8; 8];
        let mut scratch = PngScratch::new();
        decode_png(&file, &mut output, &mut scratch).unwrap();
        assert_eq!(
            output,
            [0x0A, 0x14, 0x1E, 0xFF, 0x28, 0x32, 0x3C, 0xFF]
        );
    }

    #[test]
    fn missing_palette_for_indexed_is_fatal() {
        let ihdr = ihdr_data(2, 1, 3);
        let raw_scanlines = [0u8, 0x00, 0x01];
        let file = png_file(ihdr, None, &raw_scanlines);

        let mut output = [0u8; 8];
        let mut scratch = PngScratch::new();
        assert!(decode_png(&file, &mut output, &mut scratch).is_err());
    }

    #[test]
    fn wrong_output_size_is_fatal() {
        let ihdr = ihdr_data(1, 1, 6);
        let raw_scanlines = [0u8, 0xFF, 0x00, 0x00, 0xFF];
        let file = png_file(ihdr, None, &raw_scanlines);

        let mut output = [0u8; 3];
        let mut scratch = PngScratch::new();
        assert!(decode_png(&file, &mut output, &mut scratch).is_err());
    }

    #[test]
    fn unsupported_bit_depth_is_fatal() {
        let mut ihdr = ihdr_data(1, 1, 6);
        ihdr[8] = 4; // bit depth 4, not supported
        let file = png_file(ihdr, None, &[0u8, 0, 0, 0, 0]);
        assert!(get_png_size(&file).is_err());
        let mut output = [0u8; 4];
        let mut scratch = PngScratch::new();
        assert!(decode_png(&file, &mut output, &mut scratch).is_err());
    }
}
