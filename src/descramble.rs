//! Keystream derivation and body descrambling
//!
//! Everything past the 0x14-byte plaintext header is XORed with a 256-byte
//! keystream derived from two header bytes. The scheme is obfuscation, not
//! encryption.

use crate::error::Result;
use crate::macros::{err, try_vec};

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// The first 0x14 bytes are never scrambled
pub(crate) const PLAINTEXT_LEN: usize = 0x14;

const SCRAMBLE_TYPE_OFFSET: usize = 0x12;
const SCRAMBLE_VALUE_OFFSET: usize = 0x13;
const KEYSTREAM_LEN: usize = 256;

// Scramble type 0x01: versions 5 through 9
// Scramble type 0x05: versions 10 through 12
const SCRAMBLE_TYPE_LEGACY: u8 = 0x01;
const SCRAMBLE_TYPE_MODERN: u8 = 0x05;

/// Read a session file and descramble its body in place
pub(crate) fn read_from_path(path: &Path) -> Result<Vec<u8>> {
	let mut file = File::open(path)?;
	let len = file.metadata()?.len();

	if len < PLAINTEXT_LEN as u64 {
		err!(Descramble("File is shorter than the plaintext header"));
	}

	let mut data = try_vec![0u8; len as usize];
	file.read_exact(&mut data)?;

	descramble(data)
}

/// Descramble a session file body in place
///
/// The scramble scheme byte (0x12) selects both the delta derivation and the
/// keystream indexing; the seed byte (0x13) selects the delta.
pub(crate) fn descramble(mut data: Vec<u8>) -> Result<Vec<u8>> {
	if data.len() < PLAINTEXT_LEN {
		err!(Descramble("File is shorter than the plaintext header"));
	}

	let scramble_type = data[SCRAMBLE_TYPE_OFFSET];
	let scramble_value = data[SCRAMBLE_VALUE_OFFSET];

	let delta = match scramble_type {
		SCRAMBLE_TYPE_LEGACY => scramble_delta(scramble_value, 53, false),
		SCRAMBLE_TYPE_MODERN => scramble_delta(scramble_value, 11, true),
		_ => err!(Descramble("Unknown scramble scheme")),
	};

	let keystream = keystream(delta);
	for (pos, byte) in data.iter_mut().enumerate().skip(PLAINTEXT_LEN) {
		*byte ^= keystream[keystream_index(scramble_type, pos)];
	}

	Ok(data)
}

pub(crate) fn keystream(delta: u8) -> [u8; KEYSTREAM_LEN] {
	let mut keystream = [0u8; KEYSTREAM_LEN];
	for (i, key) in keystream.iter_mut().enumerate() {
		*key = (i as u8).wrapping_mul(delta);
	}

	keystream
}

pub(crate) fn keystream_index(scramble_type: u8, pos: usize) -> usize {
	if scramble_type == SCRAMBLE_TYPE_LEGACY {
		pos & 0xFF
	} else {
		(pos >> 12) & 0xFF
	}
}

/// Find the smallest multiplicand mapping onto the seed byte
pub(crate) fn scramble_delta(scramble_value: u8, multiplier: u8, negative: bool) -> u8 {
	for i in 0..=u8::MAX {
		if i.wrapping_mul(multiplier) == scramble_value {
			return if negative { i.wrapping_neg() } else { i };
		}
	}

	// Should not occur, every multiplier used is odd (and therefore invertible)
	log::warn!("No scramble delta matches seed {scramble_value:#04x}");
	0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test_log::test]
	fn legacy_delta_is_identity_for_seed_53() {
		let delta = scramble_delta(53, 53, false);
		assert_eq!(delta, 1);

		let keystream = keystream(delta);
		for (i, key) in keystream.iter().enumerate() {
			assert_eq!(*key, i as u8);
		}
	}

	#[test_log::test]
	fn modern_delta_is_negated_for_seed_11() {
		let delta = scramble_delta(11, 11, true);
		assert_eq!(delta, 0xFF);

		let keystream = keystream(delta);
		for (i, key) in keystream.iter().enumerate() {
			assert_eq!(*key, (i as u8).wrapping_neg());
		}
	}

	#[test_log::test]
	fn descramble_round_trips() {
		let mut scrambled = vec![0u8; 0x400];
		scrambled[SCRAMBLE_TYPE_OFFSET] = SCRAMBLE_TYPE_LEGACY;
		scrambled[SCRAMBLE_VALUE_OFFSET] = 53;
		for (pos, byte) in scrambled.iter_mut().enumerate().skip(PLAINTEXT_LEN) {
			*byte = (pos % 251) as u8;
		}

		let descrambled = descramble(scrambled.clone()).unwrap();

		// Re-applying the keystream yields the original ciphertext
		let keystream = keystream(1);
		let mut rescrambled = descrambled;
		for (pos, byte) in rescrambled.iter_mut().enumerate().skip(PLAINTEXT_LEN) {
			*byte ^= keystream[keystream_index(SCRAMBLE_TYPE_LEGACY, pos)];
		}

		assert_eq!(rescrambled, scrambled);
	}

	#[test_log::test]
	fn rejects_short_and_unknown_input() {
		assert_eq!(descramble(vec![0u8; 0x13]).unwrap_err().code(), -1);

		let mut unknown = vec![0u8; 0x40];
		unknown[SCRAMBLE_TYPE_OFFSET] = 0x02;
		assert_eq!(descramble(unknown).unwrap_err().code(), -1);
	}
}
