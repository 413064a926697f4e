//! Stream decoders needed to read cross-reference and object streams.
//!
//! Signed documents written by PDF 1.5+ producers usually store their
//! cross-reference data in FlateDecode streams with a PNG predictor, so that
//! pair is what this module supports.

use crate::error::{Error, Result};

mod flate;
mod predictor;

pub use flate::FlateDecoder;
pub use predictor::{decode_predictor, DecodeParams};

/// Upper bound on a decoded stream, to stop decompression bombs.
const MAX_DECODED_SIZE: usize = 64 * 1024 * 1024;

/// Trait for PDF stream decoders.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Filter name as written in the stream dictionary.
    fn name(&self) -> &str;
}

/// Decode stream data through a filter pipeline, then undo the predictor.
pub fn decode_stream(data: &[u8], filters: &[String], params: Option<&DecodeParams>) -> Result<Vec<u8>> {
    let mut current = data.to_vec();

    for filter_name in filters {
        let decoder: Box<dyn StreamDecoder> = match filter_name.as_str() {
            "FlateDecode" | "Fl" => Box::new(FlateDecoder),
            other => return Err(Error::Decode(format!("unsupported filter: {}", other))),
        };
        current = decoder.decode(&current)?;
        if current.len() > MAX_DECODED_SIZE {
            return Err(Error::Decode(format!(
                "decoded size {} bytes exceeds limit {} bytes",
                current.len(),
                MAX_DECODED_SIZE
            )));
        }
    }

    if let Some(params) = params {
        if params.predictor > 1 {
            current = decode_predictor(&current, params)?;
        }
    }

    Ok(current)
}
