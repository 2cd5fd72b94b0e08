// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC GlobalId generation
//!
//! A GlobalId is a 128-bit UUID written as 22 characters of the IFC base-64
//! alphabet.

use uuid::Uuid;

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Length of a compressed GlobalId
pub const GLOBAL_ID_LEN: usize = 22;

/// Generate a fresh GlobalId from a random UUID
pub fn new_global_id() -> String {
    compress(Uuid::new_v4().as_bytes())
}

/// Compress 16 UUID bytes into the 22-character form
pub fn compress(bytes: &[u8; 16]) -> String {
    let mut out = String::with_capacity(GLOBAL_ID_LEN);
    push_digits(&mut out, bytes[0] as u32, 2);
    for chunk in bytes[1..].chunks_exact(3) {
        let n = (chunk[0] as u32) << 16 | (chunk[1] as u32) << 8 | chunk[2] as u32;
        push_digits(&mut out, n, 4);
    }
    out
}

fn push_digits(out: &mut String, mut n: u32, width: usize) {
    let mut digits = [0u8; 4];
    for slot in digits[..width].iter_mut().rev() {
        *slot = ALPHABET[(n % 64) as usize];
        n /= 64;
    }
    out.extend(digits[..width].iter().map(|&b| b as char));
}

/// Whether `s` is shaped like a compressed GlobalId
pub fn is_global_id(s: &str) -> bool {
    s.len() == GLOBAL_ID_LEN
        && matches!(s.as_bytes()[0], b'0'..=b'3')
        && s.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_known_values() {
        assert_eq!(compress(&[0u8; 16]), "0000000000000000000000");
        assert_eq!(compress(&[0xFF; 16]), "3$$$$$$$$$$$$$$$$$$$$$");
    }

    #[test]
    fn test_new_global_ids_are_valid_and_distinct() {
        let a = new_global_id();
        let b = new_global_id();
        assert!(is_global_id(&a), "{}", a);
        assert!(is_global_id(&b), "{}", b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_global_id_rejects_malformed() {
        assert!(!is_global_id("short"));
        assert!(!is_global_id("4000000000000000000000"));
        assert!(!is_global_id("000000000000000000000!"));
    }
}
