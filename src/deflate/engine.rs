//! Block-level DEFLATE state machine (spec §4.3).
//!
//! `inflate` is the crate's boundary-exact entry point (spec §6.1):
//! `output` is a caller-sized writable region, `input` is a raw DEFLATE
//! stream with no zlib/gzip framing, and `scratch` is the reusable working
//! set described in SPEC_FULL.md §4 (a typed realization of spec §5's
//! caller-threaded scratch memory, rather than a raw byte slice).

use super::tables::{
    self, CODE_LENGTH_ORDER, DISTANCE_TABLE, END_OF_BLOCK_SYMBOL, LENGTH_TABLE,
    NUM_CODE_LENGTH_SYMS,
};
use crate::bitstream::BitReader;
use crate::error::{ErrorKind, Fatal};
use crate::huffman::HuffmanTable;
use crate::safety_check;

/// Reusable working memory for one `inflate` call. Keeping this across
/// calls amortizes the small code-length-vector allocations; the built
/// `HuffmanTable`s themselves are local to each call since they're rebuilt
/// from scratch for every dynamic block anyway.
pub struct InflateScratch {
    code_length_lens: Vec<u8>,
    concat_lens: Vec<u8>,
}

impl InflateScratch {
    pub fn new() -> Self {
        Self {
            code_length_lens: vec![0u8; NUM_CODE_LENGTH_SYMS],
            concat_lens: Vec::with_capacity(tables::NUM_LITLEN_SYMS + tables::NUM_DISTANCE_SYMS),
        }
    }
}

impl Default for InflateScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the raw DEFLATE stream `input` into `output`, returning the
/// number of bytes written. `output` must be at least as large as the true
/// decompressed size (spec §6.1 precondition); writing past its end is
/// `Fatal(OutputOverflow)` rather than a panic.
pub fn inflate(
    output: &mut [u8],
    scratch: &mut InflateScratch,
    input: &[u8],
) -> Result<usize, Fatal> {
    safety_check!(!input.is_empty(), ErrorKind::InputTruncated);

    let mut reader = BitReader::new(input);
    let mut write_pos = 0usize;

    loop {
        let bfinal = reader.consume(1)?;
        let btype = reader.consume(2)?;

        match btype {
            0b00 => {
                write_pos = decode_stored_block(&mut reader, output, write_pos)?;
            }
            0b01 => {
                let litlen = HuffmanTable::build(&tables::fixed_litlen_lengths())?;
                let dist = HuffmanTable::build(&tables::fixed_distance_lengths())?;
                write_pos = decode_symbols(&mut reader, &litlen, &dist, output, write_pos)?;
            }
            0b10 => {
                let (litlen, dist) = build_dynamic_tables(&mut reader, scratch)?;
                write_pos = decode_symbols(&mut reader, &litlen, &dist, output, write_pos)?;
            }
            _ => return Err(Fatal(ErrorKind::InvalidSymbol)),
        }

        if bfinal == 1 {
            break;
        }
    }

    Ok(write_pos)
}

fn decode_stored_block(
    reader: &mut BitReader<'_>,
    output: &mut [u8],
    write_pos: usize,
) -> Result<usize, Fatal> {
    reader.align_to_byte();
    let len = reader.read_aligned_u16()?;
    let nlen = reader.read_aligned_u16()?;
    // NLEN must be the one's complement of LEN; treated as an invalid
    // decoded field rather than its own error category (spec's closed
    // ErrorKind list has no dedicated tag for it).
    safety_check!(nlen == !len, ErrorKind::InvalidSymbol);

    let bytes = reader.read_aligned_bytes(len as usize)?;
    safety_check!(
        write_pos + bytes.len() <= output.len(),
        ErrorKind::OutputOverflow
    );
    output[write_pos..write_pos + bytes.len()].copy_from_slice(bytes);
    Ok(write_pos + bytes.len())
}

fn build_dynamic_tables(
    reader: &mut BitReader<'_>,
    scratch: &mut InflateScratch,
) -> Result<(HuffmanTable, HuffmanTable), Fatal> {
    let hlit = reader.consume(5)? as usize + 257;
    let hdist = reader.consume(5)? as usize + 1;
    let hclen = reader.consume(4)? as usize + 4;

    for v in scratch.code_length_lens.iter_mut() {
        *v = 0;
    }
    for &slot in CODE_LENGTH_ORDER.iter().take(hclen) {
        scratch.code_length_lens[slot] = reader.consume(3)? as u8;
    }
    let code_length_table = HuffmanTable::build(&scratch.code_length_lens)?;

    scratch.concat_lens.clear();
    let total = hlit + hdist;
    while scratch.concat_lens.len() < total {
        let sym = code_length_table.decode(reader)?;
        match sym {
            0..=15 => scratch.concat_lens.push(sym as u8),
            16 => {
                let prev = *scratch
                    .concat_lens
                    .last()
                    .ok_or(Fatal(ErrorKind::InvalidSymbol))?;
                let repeat = 3 + reader.consume(2)? as usize;
                for _ in 0..repeat {
                    scratch.concat_lens.push(prev);
                }
            }
            17 => {
                let repeat = 3 + reader.consume(3)? as usize;
                for _ in 0..repeat {
                    scratch.concat_lens.push(0);
                }
            }
            18 => {
                let repeat = 11 + reader.consume(7)? as usize;
                for _ in 0..repeat {
                    scratch.concat_lens.push(0);
                }
            }
            _ => return Err(Fatal(ErrorKind::InvalidSymbol)),
        }
    }
    safety_check!(scratch.concat_lens.len() == total, ErrorKind::InvalidSymbol);

    let litlen_table = HuffmanTable::build(&scratch.concat_lens[..hlit])?;
    let dist_table = HuffmanTable::build(&scratch.concat_lens[hlit..])?;
    Ok((litlen_table, dist_table))
}

/// Decode literal/length/distance symbols until end-of-block (256),
/// writing literals and resolving back-references into `output`.
fn decode_symbols(
    reader: &mut BitReader<'_>,
    litlen: &HuffmanTable,
    dist: &HuffmanTable,
    output: &mut [u8],
    mut write_pos: usize,
) -> Result<usize, Fatal> {
    loop {
        let sym = litlen.decode(reader)?;

        if sym < END_OF_BLOCK_SYMBOL {
            safety_check!(write_pos < output.len(), ErrorKind::OutputOverflow);
            output[write_pos] = sym as u8;
            write_pos += 1;
            continue;
        }

        if sym == END_OF_BLOCK_SYMBOL {
            return Ok(write_pos);
        }

        let len_idx = (sym - END_OF_BLOCK_SYMBOL - 1) as usize;
        safety_check!(len_idx < LENGTH_TABLE.len(), ErrorKind::InvalidSymbol);
        let (extra_bits, base_len) = LENGTH_TABLE[len_idx];
        let extra = reader.consume(extra_bits as u32)?;
        let total_length = base_len as usize + extra as usize;

        let dist_sym = dist.decode(reader)?;
        let dist_idx = dist_sym as usize;
        safety_check!(dist_idx < DISTANCE_TABLE.len(), ErrorKind::InvalidSymbol);
        let (dist_extra_bits, base_dist) = DISTANCE_TABLE[dist_idx];
        let dist_extra = reader.consume(dist_extra_bits as u32)?;
        let total_dist = base_dist as usize + dist_extra as usize;

        write_pos = copy_match(output, write_pos, total_dist, total_length)?;
    }
}

/// Copy `length` bytes from `distance` bytes before `write_pos` to
/// `write_pos`, byte-by-byte so that an overlapping match (distance <
/// length) correctly replays the pattern it builds as it goes — a bulk
/// `copy_within`/memmove would read stale bytes for overlapping regions.
fn copy_match(
    output: &mut [u8],
    write_pos: usize,
    distance: usize,
    length: usize,
) -> Result<usize, Fatal> {
    safety_check!(
        distance != 0 && distance <= write_pos,
        ErrorKind::BackReferenceOutOfRange
    );
    safety_check!(
        write_pos + length <= output.len(),
        ErrorKind::OutputOverflow
    );
    let start = write_pos - distance;
    for i in 0..length {
        output[write_pos + i] = output[start + i];
    }
    Ok(write_pos + length)
}
