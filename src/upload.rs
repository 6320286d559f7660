//! Chunked upload splitting.
//!
//! The channel is JSON-only, so binary payloads travel as base64 text,
//! sliced into fixed-size chunks. Each chunk becomes an independent
//! `file/upload` call; the parent call is transmitted only once every
//! chunk across every attachment has settled successfully.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::error::LimpError;
use crate::files::FileHandle;

/// Endpoint every chunk call targets.
pub const UPLOAD_ENDPOINT: &str = "file/upload";

/// Split one attachment into per-chunk `file/upload` docs.
///
/// `attr` is the doc attribute the attachment was bound to and `index`
/// its position within that attribute. `chunk` is 1-based;
/// `total = ceil(size / chunk_size)`. A zero-byte file still produces a
/// single empty chunk so the server learns the metadata.
pub fn split_attachment(
    attr: &str,
    index: usize,
    file: &dyn FileHandle,
    chunk_size: usize,
) -> Result<Vec<Map<String, Value>>, LimpError> {
    if chunk_size == 0 {
        return Err(LimpError::Config("file_chunk_size must be non-zero".into()));
    }
    let content = file.read_bytes()?;
    if content.is_empty() {
        return Ok(vec![chunk_doc(attr, index, 1, 1, file, &[])]);
    }

    let total = content.len().div_ceil(chunk_size);
    let docs = content
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, slice)| chunk_doc(attr, index, i + 1, total, file, slice))
        .collect();
    Ok(docs)
}

fn chunk_doc(
    attr: &str,
    index: usize,
    chunk: usize,
    total: usize,
    file: &dyn FileHandle,
    slice: &[u8],
) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert("attr".into(), json!(attr));
    doc.insert("index".into(), json!(index));
    doc.insert("chunk".into(), json!(chunk));
    doc.insert("total".into(), json!(total));
    doc.insert(
        "file".into(),
        json!({
            "name": file.name(),
            "size": file.size(),
            "type": file.content_type(),
            "lastModified": file.last_modified(),
            "content": BASE64.encode(slice),
        }),
    );
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemoryFile;

    #[test]
    fn test_1200000_bytes_split_into_three_chunks() {
        let file = MemoryFile::new("cat.png", "image/png", vec![7u8; 1_200_000]);
        let docs = split_attachment("photo", 0, &file, 500 * 1024).unwrap();

        assert_eq!(docs.len(), 3);
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc["attr"], "photo");
            assert_eq!(doc["index"], 0);
            assert_eq!(doc["chunk"], i + 1);
            assert_eq!(doc["total"], 3);
            assert_eq!(doc["file"]["name"], "cat.png");
            assert_eq!(doc["file"]["size"], 1_200_000);
        }

        let sizes: Vec<usize> = docs
            .iter()
            .map(|doc| {
                BASE64
                    .decode(doc["file"]["content"].as_str().unwrap())
                    .unwrap()
                    .len()
            })
            .collect();
        assert_eq!(sizes, [512_000, 512_000, 176_000]);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_chunk() {
        let file = MemoryFile::new("a.bin", "application/octet-stream", vec![0u8; 2048]);
        let docs = split_attachment("data", 2, &file, 1024).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["chunk"], 2);
        assert_eq!(docs[1]["total"], 2);
        assert_eq!(docs[1]["index"], 2);
    }

    #[test]
    fn test_content_roundtrips_through_base64() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let file = MemoryFile::new("bytes.bin", "application/octet-stream", payload.clone());
        let docs = split_attachment("data", 0, &file, 100).unwrap();
        assert_eq!(docs.len(), 3);

        let mut rebuilt = Vec::new();
        for doc in &docs {
            rebuilt.extend(
                BASE64
                    .decode(doc["file"]["content"].as_str().unwrap())
                    .unwrap(),
            );
        }
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn test_empty_file_uploads_single_empty_chunk() {
        let file = MemoryFile::new("empty.txt", "text/plain", Vec::new());
        let docs = split_attachment("data", 0, &file, 1024).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["chunk"], 1);
        assert_eq!(docs[0]["total"], 1);
        assert_eq!(docs[0]["file"]["content"], "");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let file = MemoryFile::new("a.txt", "text/plain", vec![1]);
        assert!(split_attachment("data", 0, &file, 0).is_err());
    }
}
