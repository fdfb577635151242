//! PNG Reconstructor (spec §4.5): undoes the per-scanline filter, expands
//! palette/truecolor scanlines to RGBA.

use crate::error::{ErrorKind, Fatal};
use crate::safety_check;

/// Paeth predictor (spec §4.5). All arithmetic is on the signed difference
/// `a + b - c`; `a`, `b`, `c` themselves are unsigned byte values widened to
/// `i32` so the subtraction can't wrap.
pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let a = a as i32;
    let b = b as i32;
    let c = c as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

/// Reverse the per-scanline filter in place. `scanlines` is `height`
/// records of `1 + stride` bytes each (a filter-type byte followed by
/// `stride = width * bpc` filtered bytes), exactly the layout the DEFLATE
/// output for a PNG IDAT stream produces.
pub fn undo_filters(scanlines: &mut [u8], height: usize, stride: usize, bpc: usize) -> Result<(), Fatal> {
    let record_len = 1 + stride;
    safety_check!(
        scanlines.len() == height * record_len,
        ErrorKind::FilterCodeInvalid
    );

    for row in 0..height {
        let row_start = row * record_len;
        let filter = scanlines[row_start];
        safety_check!(filter <= 4, ErrorKind::FilterCodeInvalid);

        // Reconstruct this scanline's data bytes in place. `prev_row_start`
        // points at the previous scanline's *data* (i.e. one byte past its
        // filter byte); filter 0 on row 0 means there is no previous row.
        let data_start = row_start + 1;
        let has_prev = row > 0;
        let prev_data_start = if has_prev {
            Some(data_start - record_len)
        } else {
            None
        };

        for col in 0..stride {
            let x = scanlines[data_start + col];
            let a = if col >= bpc {
                scanlines[data_start + col - bpc]
            } else {
                0
            };
            let b = prev_data_start.map_or(0, |p| scanlines[p + col]);
            let c = if col >= bpc {
                prev_data_start.map_or(0, |p| scanlines[p + col - bpc])
            } else {
                0
            };

            let r = match filter {
                0 => x,
                1 => x.wrapping_add(a),
                2 => x.wrapping_add(b),
                3 => {
                    let avg = ((a as u16 + b as u16) / 2) as u8;
                    x.wrapping_add(avg)
                }
                4 => x.wrapping_add(paeth(a, b, c)),
                _ => unreachable!("filter byte already validated <= 4"),
            };
            scanlines[data_start + col] = r;
        }
    }

    Ok(())
}

/// Expand one already-filter-reconstructed scanline's data bytes into RGBA,
/// per spec §4.5: truecolor+alpha (bpc=4) copies straight through,
/// truecolor (bpc=3) inserts alpha=255 after every 3 bytes, indexed (bpc=1)
/// looks each byte up in `palette` and appends alpha=255.
pub fn expand_scanline_to_rgba(
    src: &[u8],
    width: usize,
    bpc: usize,
    palette: Option<&[(u8, u8, u8)]>,
    dst: &mut [u8],
) -> Result<(), Fatal> {
    safety_check!(dst.len() == width * 4, ErrorKind::UnsupportedFormat);
    match bpc {
        4 => {
            safety_check!(src.len() == width * 4, ErrorKind::UnsupportedFormat);
            dst.copy_from_slice(src);
        }
        3 => {
            safety_check!(src.len() == width * 3, ErrorKind::UnsupportedFormat);
            for px in 0..width {
                dst[px * 4] = src[px * 3];
                dst[px * 4 + 1] = src[px * 3 + 1];
                dst[px * 4 + 2] = src[px * 3 + 2];
                dst[px * 4 + 3] = 255;
            }
        }
        1 => {
            let palette = palette.ok_or(Fatal(ErrorKind::UnsupportedFormat))?;
            safety_check!(src.len() == width, ErrorKind::UnsupportedFormat);
            for px in 0..width {
                let idx = src[px] as usize;
                safety_check!(idx < palette.len(), ErrorKind::InvalidSymbol);
                let (r, g, b) = palette[idx];
                dst[px * 4] = r;
                dst[px * 4 + 1] = g;
                dst[px * 4 + 2] = b;
                dst[px * 4 + 3] = 255;
            }
        }
        _ => return Err(Fatal(ErrorKind::UnsupportedFormat)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_zero_is_identity() {
        let stride = 3;
        let bpc = 3;
        let mut scanlines = vec![0u8, 10, 20, 30];
        let original = scanlines.clone();
        undo_filters(&mut scanlines, 1, stride, bpc).unwrap();
        assert_eq!(scanlines, original);
    }

    #[test]
    fn paeth_corner_cases() {
        assert_eq!(paeth(7, 7, 7), 7);
        let r = paeth(10, 20, 10);
        assert!(r == 10 || r == 20);
        assert_eq!(paeth(0, 0, 0), 0);
    }

    #[test]
    fn filter_code_above_four_is_fatal() {
        let mut scanlines = vec![5u8, 1, 2, 3];
        assert!(undo_filters(&mut scanlines, 1, 3, 3).is_err());
    }

    #[test]
    fn sub_filter_reconstructs_running_sum() {
        // bpc=1, stride=3: filter=1 (Sub), raw deltas [10, 5, 250]
        // reconstructs to [10, 15, 9] (250 wraps 15+250=265 mod 256 = 9).
        let mut scanlines = vec![1u8, 10, 5, 250];
        undo_filters(&mut scanlines, 1, 3, 1).unwrap();
        assert_eq!(&scanlines[1..], &[10, 15, 9]);
    }

    #[test]
    fn expand_truecolor_inserts_alpha() {
        let src = [10u8, 20, 30, 40, 50, 60];
        let mut dst = [0u8; 8];
        expand_scanline_to_rgba(&src, 2, 3, None, &mut dst).unwrap();
        assert_eq!(dst, [10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn expand_indexed_uses_palette() {
        let palette = [(10u8, 20u8, 30u8), (40, 50, 60)];
        let src = [0u8, 1];
        let mut dst = [0u8; 8];
        expand_scanline_to_rgba(&src, 2, 1, Some(&palette), &mut dst).unwrap();
        assert_eq!(dst, [10, 20, 30, 255, 40, 50, 60, 255]);
    }
}
