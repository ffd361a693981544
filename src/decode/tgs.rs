use std::{io::Read as _, path::Path};

use flate2::read::{MultiGzDecoder, ZlibDecoder};

use crate::{
    animation::model::Animation,
    foundation::error::{ConvertError, ConvertResult},
};

/// Inflated payloads larger than this are rejected.
pub const MAX_INFLATED_BYTES: u64 = 64 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Deflate framing recognized in sticker files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
}

/// Sniff the framing from the first bytes.
pub fn detect_compression(bytes: &[u8]) -> Option<Compression> {
    if bytes.starts_with(&GZIP_MAGIC) {
        return Some(Compression::Gzip);
    }
    if let [cmf, flg, ..] = *bytes {
        // RFC 1950: CM = 8 (deflate), CINFO <= 7, header checksum divisible by 31.
        let header = (u16::from(cmf) << 8) | u16::from(flg);
        if cmf & 0x0f == 8 && cmf >> 4 <= 7 && header % 31 == 0 {
            return Some(Compression::Zlib);
        }
    }
    None
}

/// Inflate a gzip or zlib payload into UTF-8 text.
pub fn inflate_to_string(bytes: &[u8]) -> ConvertResult<String> {
    let kind = detect_compression(bytes)
        .ok_or_else(|| ConvertError::format("input is not a gzip or zlib compressed payload"))?;

    let reader: Box<dyn std::io::Read + '_> = match kind {
        Compression::Gzip => Box::new(MultiGzDecoder::new(bytes)),
        Compression::Zlib => Box::new(ZlibDecoder::new(bytes)),
    };

    let mut out = Vec::new();
    reader
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut out)
        .map_err(|e| ConvertError::format(format!("failed to inflate {kind:?} payload: {e}")))?;

    if out.len() as u64 > MAX_INFLATED_BYTES {
        return Err(ConvertError::format(format!(
            "inflated payload exceeds {MAX_INFLATED_BYTES} bytes"
        )));
    }

    String::from_utf8(out)
        .map_err(|e| ConvertError::format(format!("inflated payload is not UTF-8 text: {e}")))
}

/// Decompress and parse an in-memory sticker.
pub fn decode_bytes(bytes: &[u8]) -> ConvertResult<Animation> {
    let text = inflate_to_string(bytes)?;
    Animation::from_json_str(&text)
}

/// Read, decompress and parse a sticker file.
#[tracing::instrument(level = "debug")]
pub fn decode_file(path: &Path) -> ConvertResult<Animation> {
    let bytes = std::fs::read(path).map_err(|e| ConvertError::io_at("read input", path, e))?;
    let anim = decode_bytes(&bytes)?;
    tracing::debug!(
        ip = anim.in_point(),
        op = anim.out_point(),
        fr = anim.frame_rate(),
        frames = anim.frame_count(),
        "decoded animation"
    );
    Ok(anim)
}

#[cfg(test)]
#[path = "../../tests/unit/decode/tgs.rs"]
mod tests;
