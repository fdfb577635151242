//! Canonical Huffman construction and decoding (spec §4.2: Huffman Builder
//! and Huffman Lookup).
//!
//! Builds a direct lookup table indexed by the next `max_len` bits peeked
//! from the stream — the alternative spec.md's Design Notes call out
//! explicitly ("A 15-bit indexed table of size 32768 entries ... either is
//! acceptable. The hashed design is idiosyncratic and not required."). The
//! teacher's two-level subtable/fast-path machinery earns its complexity
//! only under the streaming, SIMD-friendly constraints this crate doesn't
//! have; the direct table is the right tool here.

use crate::bitstream::{reverse_bits, BitReader};
use crate::error::{ErrorKind, Fatal};
use crate::safety_check;

pub const MAX_CODE_LENGTH: u32 = 15;

#[derive(Clone, Copy, Default)]
struct TableEntry {
    /// Decoded symbol. Only meaningful when `length != 0`.
    symbol: u16,
    /// Code length in bits, or 0 for a slot no valid code reaches.
    length: u8,
}

/// A canonical Huffman code-to-symbol table, good for one DEFLATE block.
pub struct HuffmanTable {
    table: Vec<TableEntry>,
    max_len: u32,
}

impl HuffmanTable {
    /// Build from a code-length vector where `lens[i]` is the length
    /// assigned to symbol `i` (0 = unused). `lens[i]` must be `<=
    /// MAX_CODE_LENGTH`.
    pub fn build(lens: &[u8]) -> Result<Self, Fatal> {
        let mut bl_count = [0u32; MAX_CODE_LENGTH as usize + 1];
        let mut max_len = 0u32;
        for &len in lens {
            safety_check!(
                (len as u32) <= MAX_CODE_LENGTH,
                ErrorKind::OversubscribedHuffman
            );
            if len > 0 {
                bl_count[len as usize] += 1;
                max_len = max_len.max(len as u32);
            }
        }
        safety_check!(max_len > 0, ErrorKind::OversubscribedHuffman);

        let mut next_code = [0u32; MAX_CODE_LENGTH as usize + 2];
        let mut code = 0u32;
        for len in 1..=max_len {
            code = (code + bl_count[(len - 1) as usize]) << 1;
            next_code[len as usize] = code;
            // The final value of next_code[len] after every symbol of this
            // length has been assigned must still fit in `len` bits.
            safety_check!(
                code as u64 + bl_count[len as usize] as u64 <= (1u64 << len),
                ErrorKind::OversubscribedHuffman
            );
        }

        let mut table = vec![TableEntry::default(); 1usize << max_len];
        for (symbol, &len) in lens.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let len = len as u32;
            safety_check!(symbol <= u16::MAX as usize, ErrorKind::OversubscribedHuffman);
            let assigned = next_code[len as usize];
            next_code[len as usize] += 1;
            let reversed = reverse_bits(assigned, len);
            let fill_step = 1u32 << len;
            let mut index = reversed;
            while (index as usize) < table.len() {
                table[index as usize] = TableEntry {
                    symbol: symbol as u16,
                    length: len as u8,
                };
                index += fill_step;
            }
        }

        Ok(Self { table, max_len })
    }

    /// Decode one symbol from `reader`, consuming exactly its code length in
    /// bits. Fails if the stream runs out mid-symbol or the bits read match
    /// no assigned code (a malformed / incomplete code).
    ///
    /// Peeks `max_len` bits zero-padded past the end of input rather than
    /// requiring that many bits up front: a code shorter than `max_len` may
    /// legitimately be the last thing in the stream (e.g. the final block's
    /// end-of-block symbol with nothing after it but byte-alignment
    /// padding), and `require`-ing the full `max_len` there would reject
    /// valid input. Only the entry's actual code length needs real bits
    /// behind it.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16, Fatal> {
        let peeked = reader.peek(self.max_len) as usize;
        let entry = self.table[peeked];
        safety_check!(entry.length != 0, ErrorKind::InvalidSymbol);
        reader.require(entry.length as u32)?;
        reader.discard(entry.length as u32);
        Ok(entry.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 1951 §3.2.2 worked example: symbols A,B,C,D,E with lengths
    /// 3,3,3,3,3 is invalid (oversubscribed); use the canonical example
    /// instead: lengths 2,1,3,3 for symbols 0..4 (one symbol unused).
    #[test]
    fn canonical_construction_decodes_every_symbol() {
        // lens: sym0=2, sym1=1, sym2=3, sym3=3
        let lens = [2u8, 1, 3, 3];
        let table = HuffmanTable::build(&lens).unwrap();

        // Expected canonical codes (MSB-first): sym1=0 (1 bit), sym0=10 (2
        // bits), sym2=110 (3 bits), sym3=111 (3 bits).
        // Build a byte stream carrying, back to back: sym1, sym0, sym2, sym3
        // i.e. bits (MSB-first per code, concatenated): 0 10 110 111
        // = 0_10_110_111 = 10 bits: 0101101 11 -> pack LSB-first per byte.
        let bits: Vec<u8> = vec![0, 1, 0, 1, 1, 0, 1, 1, 1]; // one bit per entry, MSB-first order of each code
        // Manually assemble: code bits in transmission order (first bit
        // first): [0] [1,0] [1,1,0] [1,1,1]
        let mut stream_bits = vec![0u8];
        stream_bits.extend([1, 0]);
        stream_bits.extend([1, 1, 0]);
        stream_bits.extend([1, 1, 1]);
        let _ = bits;

        let mut byte = 0u8;
        let mut nbits = 0u32;
        let mut bytes = Vec::new();
        for b in stream_bits {
            byte |= b << nbits;
            nbits += 1;
            if nbits == 8 {
                bytes.push(byte);
                byte = 0;
                nbits = 0;
            }
        }
        if nbits > 0 {
            bytes.push(byte);
        }

        let mut reader = BitReader::new(&bytes);
        assert_eq!(table.decode(&mut reader).unwrap(), 1);
        assert_eq!(table.decode(&mut reader).unwrap(), 0);
        assert_eq!(table.decode(&mut reader).unwrap(), 2);
        assert_eq!(table.decode(&mut reader).unwrap(), 3);
    }

    #[test]
    fn oversubscribed_code_is_rejected() {
        // Four symbols all of length 1 cannot form a valid prefix code.
        let lens = [1u8, 1, 1, 1];
        assert!(HuffmanTable::build(&lens).is_err());
    }

    #[test]
    fn all_zero_lengths_is_rejected() {
        let lens = [0u8, 0, 0];
        assert!(HuffmanTable::build(&lens).is_err());
    }

    #[test]
    fn single_symbol_code_decodes_its_one_valid_codeword() {
        // One symbol of length 1 is under-subscribed but legal (DEFLATE
        // allows this, e.g. a single distance code per RFC 1951 §3.2.7).
        // The encoder can only ever emit the assigned codeword ("0"); the
        // complementary bit pattern corresponds to no symbol and must still
        // be rejected as an invalid code, not silently accepted.
        let lens = [1u8];
        let table = HuffmanTable::build(&lens).unwrap();

        let zero_bit = [0b0000_0000u8];
        let mut reader = BitReader::new(&zero_bit);
        assert_eq!(table.decode(&mut reader).unwrap(), 0);

        let one_bit = [0b1111_1111u8];
        let mut reader = BitReader::new(&one_bit);
        assert!(table.decode(&mut reader).is_err());
    }
}
