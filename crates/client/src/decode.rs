//! Stateful byte-to-text decoding for streamed response bodies.
//!
//! The endpoint streams raw UTF-8 with no framing, so a multi-byte character
//! can be split across two network chunks. The decoder carries the trailing
//! partial sequence between calls instead of decoding each chunk
//! independently, which would truncate or mangle the split character.

/// Incremental UTF-8 decoder.
///
/// `decode` returns all complete characters seen so far; an incomplete
/// trailing sequence is held back until the next chunk (or `finish`).
/// Invalid sequences decode to U+FFFD rather than failing, so a decoding
/// anomaly never aborts the stream.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    carry: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, including any bytes carried over from the
    /// previous call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.carry.extend_from_slice(chunk);

        let mut out = String::new();
        let mut rest: &[u8] = &self.carry;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    // Safety by construction: from_utf8 validated this prefix.
                    out.push_str(std::str::from_utf8(&rest[..valid_up_to]).unwrap_or(""));

                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid_up_to + bad..];
                        }
                        None => {
                            // Incomplete trailing sequence: keep for next chunk.
                            rest = &rest[valid_up_to..];
                            break;
                        }
                    }
                }
            }
        }

        self.carry = rest.to_vec();
        out
    }

    /// Flush the decoder at end-of-stream. A dangling partial sequence is an
    /// anomaly and decodes to U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            return String::new();
        }
        self.carry.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }

    /// Bytes currently held back waiting for the rest of a sequence.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}
