//! Payload compression behind the header's `compressor_id`.
//!
//! The frozen fields frame the compressed payload (`stored_len` bytes
//! on disk, `payload_len` after expansion); the compressed bytes
//! themselves are an opaque deflate stream. Ids `ans` and `zstd` are
//! reserved in the header schema and rejected here.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rustyflow_core::FlowError;
use std::io::{Read, Write};

use crate::header::Compressor;

pub fn compress(data: &[u8], compressor: Compressor) -> Result<Vec<u8>, FlowError> {
    match compressor {
        Compressor::None => Ok(data.to_vec()),
        Compressor::Deflate => {
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(data)?;
            Ok(enc.finish()?)
        }
        Compressor::Ans | Compressor::Zstd => {
            Err(FlowError::UnsupportedCompressor(compressor as u8))
        }
    }
}

pub fn decompress(
    data: &[u8],
    compressor: Compressor,
    expected_len: u64,
) -> Result<Vec<u8>, FlowError> {
    let out = match compressor {
        Compressor::None => data.to_vec(),
        Compressor::Deflate => {
            let mut dec = ZlibDecoder::new(data);
            let mut out = Vec::with_capacity(expected_len as usize);
            dec.read_to_end(&mut out)?;
            out
        }
        Compressor::Ans | Compressor::Zstd => {
            return Err(FlowError::UnsupportedCompressor(compressor as u8))
        }
    };
    if out.len() as u64 != expected_len {
        return Err(FlowError::Configuration(format!(
            "payload expanded to {} bytes, header says {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}
