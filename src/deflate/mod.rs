//! DEFLATE Engine (spec §4.3): the block-level state machine for stored,
//! fixed-Huffman and dynamic-Huffman blocks, plus back-reference copying.

mod engine;
pub mod tables;

pub use engine::{inflate, InflateScratch};
