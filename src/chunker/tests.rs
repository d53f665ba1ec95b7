//! Chunk Codec Tests
//!
//! ## Test Scopes
//! - **Splitting**: chunk counts, boundary sizes and identifier determinism.
//! - **Reassembly**: order independence, gap/duplicate detection, atomic output.

#[cfg(test)]
mod tests {
    use crate::chunker::{Chunk, ChunkData, Chunker, chunk_id, reassemble};
    use crate::error::StorageError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn sample_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    fn roundtrip(bytes: &[u8], chunk_size: usize) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");

        let split = Chunker::new(chunk_size).unwrap().split(bytes).unwrap();
        let written = reassemble(split.chunks.into_iter().map(ChunkData::from), &out).unwrap();
        assert_eq!(written as usize, bytes.len());

        std::fs::read(&out).unwrap()
    }

    // ============================================================
    // SPLIT TESTS
    // ============================================================

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        assert!(matches!(Chunker::new(0), Err(StorageError::InvalidChunkSize)));
    }

    #[test]
    fn test_chunk_count_is_ceil_of_size() {
        let chunker = Chunker::new(10).unwrap();

        for (len, expected) in [(1, 1), (9, 1), (10, 1), (11, 2), (20, 2), (21, 3), (95, 10)] {
            let split = chunker.split(&sample_bytes(len)[..]).unwrap();
            assert_eq!(split.total_chunks, expected, "size {}", len);
            assert_eq!(split.chunks.len() as u32, expected);
            assert_eq!(split.size, len as u64);
        }
    }

    #[test]
    fn test_empty_input_yields_single_empty_chunk() {
        let split = Chunker::new(1024).unwrap().split(std::io::empty()).unwrap();

        assert_eq!(split.total_chunks, 1);
        assert_eq!(split.chunks.len(), 1);
        assert_eq!(split.chunks[0].index, 0);
        assert_eq!(split.chunks[0].size, 0);
        assert!(split.chunks[0].data.is_empty());
        assert_eq!(split.chunks[0].chunk_id, chunk_id(&split.file_id, 0, &[]));
    }

    #[test]
    fn test_only_last_chunk_is_short() {
        let split = Chunker::new(8).unwrap().split(&sample_bytes(30)[..]).unwrap();

        let sizes: Vec<usize> = split.chunks.iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![8, 8, 8, 6]);

        let indices: Vec<u32> = split.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_chunk_ids_are_deterministic_for_same_file_id() {
        let chunker = Chunker::new(16).unwrap();
        let bytes = sample_bytes(100);

        let first = chunker.split_with_id("file-a", &bytes[..]).unwrap();
        let second = chunker.split_with_id("file-a", &bytes[..]).unwrap();

        let ids = |chunks: &[Chunk]| chunks.iter().map(|c| c.chunk_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first.chunks), ids(&second.chunks));
    }

    #[test]
    fn test_chunk_id_depends_on_index_and_content() {
        let a = chunk_id("f", 0, b"payload");
        assert_eq!(a, "f_0_321c3cf486ed509164edec1e1981fec8");
        assert_ne!(a, chunk_id("f", 1, b"payload"));
        assert_ne!(a, chunk_id("f", 0, b"payloaD"));
        assert_ne!(a, chunk_id("g", 0, b"payload"));
    }

    #[test]
    fn test_fresh_file_ids_are_unique() {
        let chunker = Chunker::default();
        let a = chunker.split(&b"same"[..]).unwrap();
        let b = chunker.split(&b"same"[..]).unwrap();

        assert_ne!(a.file_id, b.file_id);
    }

    #[test]
    fn test_split_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, sample_bytes(2500)).unwrap();

        let split = Chunker::new(1024).unwrap().split_file(&path).unwrap();
        assert_eq!(split.total_chunks, 3);
        assert_eq!(split.size, 2500);
    }

    // ============================================================
    // REASSEMBLY TESTS
    // ============================================================

    #[test]
    fn test_roundtrip_boundary_sizes() {
        for len in [0, 1, 63, 64, 65, 1000] {
            let bytes = sample_bytes(len);
            assert_eq!(roundtrip(&bytes, 64), bytes, "length {}", len);
        }
    }

    #[test]
    fn test_roundtrip_input_smaller_than_chunk() {
        let bytes = b"tiny".to_vec();
        assert_eq!(roundtrip(&bytes, crate::chunker::DEFAULT_CHUNK_SIZE), bytes);
    }

    #[test]
    fn test_reassembly_is_order_independent() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = sample_bytes(777);
        let split = Chunker::new(50).unwrap().split(&bytes[..]).unwrap();

        let in_order: Vec<ChunkData> = split.chunks.iter().cloned().map(Into::into).collect();
        let mut shuffled = in_order.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(7));
        assert_ne!(shuffled, in_order, "seeded shuffle should change the order");

        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        reassemble(in_order, &a).unwrap();
        reassemble(shuffled, &b).unwrap();

        assert_eq!(std::fs::read(&a).unwrap(), bytes);
        assert_eq!(std::fs::read(&b).unwrap(), bytes);
    }

    #[test]
    fn test_reassembly_rejects_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let chunks = vec![
            ChunkData { index: 0, data: b"a".to_vec() },
            ChunkData { index: 2, data: b"c".to_vec() },
        ];

        let result = reassemble(chunks, &out);

        assert!(matches!(result, Err(StorageError::MissingChunkIndex(1))));
        assert!(!out.exists(), "no partial output should be visible");
    }

    #[test]
    fn test_reassembly_rejects_missing_first_index() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = vec![ChunkData { index: 1, data: b"b".to_vec() }];

        let result = reassemble(chunks, &dir.path().join("out.bin"));
        assert!(matches!(result, Err(StorageError::MissingChunkIndex(0))));
    }

    #[test]
    fn test_reassembly_rejects_duplicate_index() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let chunks = vec![
            ChunkData { index: 1, data: b"b".to_vec() },
            ChunkData { index: 0, data: b"a".to_vec() },
            ChunkData { index: 1, data: b"b".to_vec() },
        ];

        let result = reassemble(chunks, &out);

        assert!(matches!(result, Err(StorageError::DuplicateChunkIndex(1))));
        assert!(!out.exists());
    }

    #[test]
    fn test_reassembly_rejects_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let result = reassemble(Vec::new(), &dir.path().join("out.bin"));
        assert!(matches!(result, Err(StorageError::MissingChunkIndex(0))));
    }

    #[test]
    fn test_failed_reassembly_keeps_previous_destination() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        std::fs::write(&out, b"previous").unwrap();

        let result = reassemble(vec![ChunkData { index: 3, data: vec![1] }], &out);

        assert!(result.is_err());
        assert_eq!(std::fs::read(&out).unwrap(), b"previous");
    }

    #[test]
    fn test_reassembly_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("downloads").join("nested").join("file.bin");

        reassemble(vec![ChunkData { index: 0, data: b"x".to_vec() }], &out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"x");
    }
}
