pub mod store;
pub mod types;

use anyhow::{ensure, Result};

/// Encode an embedding as a little-endian `f32` blob.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode a little-endian `f32` blob written by [`embedding_to_bytes`].
pub fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    ensure!(
        bytes.len() % std::mem::size_of::<f32>() == 0,
        "embedding blob of {} bytes is not a whole number of f32 values",
        bytes.len()
    );
    Ok(bytes
        .chunks_exact(std::mem::size_of::<f32>())
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_layout_is_little_endian() {
        assert_eq!(embedding_to_bytes(&[1.0]), vec![0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(bytes_to_embedding(&[0x00, 0x00, 0x80, 0x3f]).unwrap(), vec![1.0]);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        assert!(bytes_to_embedding(&[0, 0, 0]).is_err());
        assert!(bytes_to_embedding(&[]).unwrap().is_empty());
    }
}
