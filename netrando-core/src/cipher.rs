use serde::{Deserialize, Serialize};

/// Length of a number code, in digits.
pub const CODE_LEN: usize = 8;

/// Length of the obfuscation key.
pub const KEY_LEN: usize = 10;

/// Key used by the Battle Network 5 and 6 number-code tables.
pub const DEFAULT_KEY: [u8; KEY_LEN] = [0x3E, 0x45, 0xCC, 0x86, 0x90, 0x18, 0x4F, 0x09, 0x61, 0xE9];

/// Reversible obfuscation applied to stored number codes.
///
/// Digit `i` is XORed with key byte `i`, then offset by one of the two
/// trailing key bytes depending on the digit's parity. Not cryptography.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberCodeCipher {
    key: [u8; KEY_LEN],
}

impl Default for NumberCodeCipher {
    fn default() -> Self {
        Self { key: DEFAULT_KEY }
    }
}

impl NumberCodeCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    pub fn decode(&self, payload: &[u8; CODE_LEN]) -> [u8; CODE_LEN] {
        decode(payload, &self.key)
    }

    pub fn encode(&self, plain: &[u8; CODE_LEN]) -> [u8; CODE_LEN] {
        encode(plain, &self.key)
    }
}

fn offset_byte(key: &[u8; KEY_LEN], i: usize) -> u8 {
    key[CODE_LEN + (i & 1)]
}

pub fn decode(payload: &[u8; CODE_LEN], key: &[u8; KEY_LEN]) -> [u8; CODE_LEN] {
    let mut plain = [0u8; CODE_LEN];
    for (i, (out, &b)) in plain.iter_mut().zip(payload).enumerate() {
        *out = (b ^ key[i]).wrapping_sub(offset_byte(key, i));
    }
    plain
}

pub fn encode(plain: &[u8; CODE_LEN], key: &[u8; KEY_LEN]) -> [u8; CODE_LEN] {
    let mut payload = [0u8; CODE_LEN];
    for (i, (out, &b)) in payload.iter_mut().zip(plain).enumerate() {
        *out = b.wrapping_add(offset_byte(key, i)) ^ key[i];
    }
    payload
}
