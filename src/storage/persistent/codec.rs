//! Binary framing for stored blobs.
//!
//! Every blob file is written as:
//! - Magic bytes and a version byte identifying the file
//! - A length-prefixed frame holding the opaque payload
//! - A CRC32 checksum over the payload for corruption detection

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use crc32fast::Hasher;

/// Current codec version.
pub const CODEC_VERSION: u8 = 1;

/// Magic bytes to identify reviewledger blob files.
pub const MAGIC: [u8; 4] = *b"RVLG";

/// Hard upper bound for a single frame payload (100 MB).
pub const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Length of the file header written by [`write_header`].
pub const HEADER_LEN: usize = MAGIC.len() + 1;

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Frames an opaque payload with its checksum.
///
/// Format:
/// ```text
/// [version: 1 byte][length: 4 bytes LE][payload: N bytes][crc32: 4 bytes LE]
/// ```
pub fn encode_frame(payload: &[u8]) -> IoResult<Vec<u8>> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(IoError::new(
            ErrorKind::InvalidInput,
            format!("payload size {} exceeds maximum {}", payload.len(), MAX_FRAME_SIZE),
        ));
    }
    let len = u32::try_from(payload.len())
        .map_err(|_| IoError::new(ErrorKind::InvalidInput, "payload length overflows u32"))?;

    let mut out = Vec::with_capacity(1 + 4 + payload.len() + 4);
    out.push(CODEC_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&checksum(payload).to_le_bytes());

    Ok(out)
}

/// Reads one frame and returns its payload, verifying the checksum.
///
/// # Errors
/// - `InvalidData` if the version is unsupported, the declared length is
///   above `max_len`, or the checksum does not match
/// - `UnexpectedEof` if the frame is truncated
pub fn decode_frame(reader: &mut impl Read, max_len: usize) -> IoResult<Vec<u8>> {
    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;

    if version[0] != CODEC_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("unsupported frame version: {} (expected {})", version[0], CODEC_VERSION),
        ));
    }

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    // Reject before allocating
    if len > max_len.min(MAX_FRAME_SIZE) {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("frame size {} exceeds maximum {}", len, max_len.min(MAX_FRAME_SIZE)),
        ));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;

    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes)?;
    let stored_crc = u32::from_le_bytes(crc_bytes);
    let computed_crc = checksum(&data);

    if stored_crc != computed_crc {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!(
                "CRC mismatch: stored={stored_crc:08x}, computed={computed_crc:08x} (data corrupted)"
            ),
        ));
    }

    Ok(data)
}

/// Payload length declared by the frame at the start of `frame`.
///
/// Returns `None` if the length prefix is cut off or the frame is shorter
/// than the length it declares.
pub fn declared_len(frame: &[u8]) -> Option<usize> {
    let len_bytes: [u8; 4] = frame.get(1..5)?.try_into().ok()?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    (frame.len() >= 1 + 4 + len + 4).then_some(len)
}

/// Write the file header (magic + version).
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[CODEC_VERSION])?;
    Ok(())
}

/// Read and validate the file header, returning its version.
pub fn read_header(reader: &mut impl Read) -> IoResult<u8> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;

    if magic != MAGIC {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("invalid magic bytes: expected {MAGIC:?}, got {magic:?}"),
        ));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;

    if version[0] != CODEC_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("unsupported file version: {} (expected {})", version[0], CODEC_VERSION),
        ));
    }

    Ok(version[0])
}
