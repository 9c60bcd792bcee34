/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Number of bytes in a mebibyte
pub const MEBIBYTE: usize = 1024 * 1024;

/// The byte stored at `offset` of an alphabet payload.
pub fn alphabet_byte(offset: u64) -> u8 {
    b'a' + (offset % 26) as u8
}

/// `len` bytes cycling through the lowercase alphabet, starting at `start`.
///
/// Writing consecutive slices produced with increasing `start` values yields the same file as
/// one large payload, which makes ranged reads easy to check at any offset.
pub fn alphabet_payload(start: u64, len: usize) -> Vec<u8> {
    (0..len as u64).map(|i| alphabet_byte(start + i)).collect()
}

/// `len` random bytes from a generator seeded with `seed`.
pub fn random_payload(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut data = vec![0; len];
    rng.fill(&mut data);
    data
}

/// Split `data` into chunks of random sizes between 1 and `max_chunk` bytes.
pub fn random_chunks(seed: u64, data: &[u8], max_chunk: usize) -> Vec<&[u8]> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut chunks = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let len = rng.usize(1..=max_chunk.max(1)).min(rest.len());
        let (chunk, tail) = rest.split_at(len);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Install a test subscriber honoring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
