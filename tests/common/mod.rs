#![allow(dead_code)]

use lzjb_stream::{MATCH_MAX, MAX_OFFSET};
use std::collections::HashMap;

const MATCH_MIN: usize = 3;

/// Greedy LZJB encoder, only good enough to produce test streams.
pub fn compress(src: &[u8]) -> Vec<u8> {
    let mut dst = Vec::new();
    let mut recent: HashMap<[u8; 3], usize> = HashMap::new();

    let mut control_index = 0;
    let mut bit = 8;
    let mut pos = 0;

    while pos < src.len() {
        if bit == 8 {
            control_index = dst.len();
            dst.push(0);
            bit = 0;
        }

        let found = src
            .get(pos..pos + MATCH_MIN)
            .and_then(|key| {
                let key = [key[0], key[1], key[2]];
                recent.insert(key, pos)
            })
            .filter(|&candidate| pos - candidate <= MAX_OFFSET);

        let length = found.map_or(0, |candidate| {
            src[pos..]
                .iter()
                .zip(&src[candidate..])
                .take(MATCH_MAX)
                .take_while(|(a, b)| a == b)
                .count()
        });

        if let (Some(candidate), true) = (found, length >= MATCH_MIN) {
            let offset = pos - candidate;
            dst[control_index] |= 1 << bit;
            dst.push((((length - MATCH_MIN) << 2) | (offset >> 8)) as u8);
            dst.push(offset as u8);
            pos += length;
        } else {
            dst.push(src[pos]);
            pos += 1;
        }

        bit += 1;
    }

    dst
}

/// Deterministic test input with plenty of short and long repeats.
pub fn sample_data(len: usize) -> Vec<u8> {
    let words: [&[u8]; 6] = [b"lorem ", b"ipsum ", b"dolor ", b"aaaaaaaaaaaa", b"\n", b"sit amet, "];
    let mut state: u32 = 0x2545_f491;
    let mut data = Vec::with_capacity(len);

    while data.len() < len {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;

        if state % 7 == 0 {
            data.push((state >> 8) as u8);
        } else {
            data.extend_from_slice(words[state as usize % words.len()]);
        }
    }

    data.truncate(len);
    data
}
