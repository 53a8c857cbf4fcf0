use std::io::{self, Read, Write};
use std::path::Path;

use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Buffer size for streaming through payloads (hashing and copying).
pub const STREAM_BUFFER_SIZE: usize = 8192;

/// Hash everything `reader` yields, without loading it all into memory.
pub fn hash_reader(reader: &mut dyn Read) -> io::Result<String> {
    hash_stream(reader, None).map(|(_, hash)| hash)
}

/// Stream `reader` through the hasher, copying each chunk into `tee` when
/// given. Returns the byte count and the hex hash.
pub fn hash_stream(
    reader: &mut dyn Read,
    mut tee: Option<&mut dyn Write>,
) -> io::Result<(u64, String)> {
    let mut hasher = Hasher::new();
    let mut buf = [0u8; STREAM_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if let Some(out) = tee.as_deref_mut() {
            out.write_all(&buf[..n])?;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    if let Some(out) = tee {
        out.flush()?;
    }
    Ok((total, hasher.finalize().to_hex().to_string()))
}

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> io::Result<String> {
    let mut file = fs.open_read(path)?;
    let hash = hash_reader(&mut file)?;
    debug!(path = ?path, hash = %hash, "hashed installed file");
    Ok(hash)
}
