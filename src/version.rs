//! Session detection and version probing

use crate::block;
use crate::error::Result;
use crate::macros::err;
use crate::reader::{Endianness, SessionReader};

/// ASCII bitcode embedded near the start of every session
const BITCODE: &[u8] = b"0010111100101011";
const SESSION_MARKER: u8 = 0x03;
const ENDIANNESS_OFFSET: u32 = 0x11;
/// Position of the version probe block
const PROBE_BLOCK_POS: u32 = 0x1F;

pub(crate) const MIN_VERSION: u8 = 5;
pub(crate) const MAX_VERSION: u8 = 12;

/// Byte order of the file, from plaintext header byte 0x11
pub(crate) fn detect_endianness(data: &[u8]) -> Endianness {
	match data.get(ENDIANNESS_OFFSET as usize) {
		Some(0) | None => Endianness::Little,
		Some(_) => Endianness::Big,
	}
}

/// Detect the session signature and derive the format version
///
/// Modern sessions carry a probe block at 0x1F naming the version; older ones
/// store it at one of a few fixed header offsets. The final version must be
/// within [`MIN_VERSION`]..=[`MAX_VERSION`].
pub(crate) fn probe(reader: &SessionReader<'_>) -> Result<u8> {
	let has_marker = reader.byte_at(0) == Some(SESSION_MARKER);
	let has_bitcode = reader.find(BITCODE, 0, 0x100).is_some();
	if !has_marker && !has_bitcode {
		err!(NotASession);
	}

	let version = match block::block_at(reader, PROBE_BLOCK_POS, reader.len()) {
		Some(block) if block.content_type == 0x0003 => {
			// Legacy: the version trails the embedded product string
			let Some(product_len) = reader.u32_at(block.offset + 3) else {
				err!(NotASession);
			};
			let Some(raw) = reader.u32_at(block.offset + 3 + product_len + 8) else {
				err!(NotASession);
			};
			raw as u8
		},
		Some(block) if block.content_type == 0x2067 => {
			// Modern: a fixed-position field, off by two
			let Some(raw) = reader.u32_at(block.offset + 20) else {
				err!(NotASession);
			};
			(raw as u8).wrapping_add(2)
		},
		Some(_) => err!(NotASession),
		None => {
			// Header-offset fallback chain, first nonzero wins
			let mut version = reader.byte_at(0x40).unwrap_or(0);
			if version == 0 {
				version = reader.byte_at(0x3D).unwrap_or(0);
			}
			if version == 0 {
				version = reader.byte_at(0x3A).unwrap_or(0).wrapping_add(2);
			}
			if version == 0 {
				err!(NotASession);
			}
			version
		},
	};

	if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
		err!(UnsupportedVersion(version));
	}

	Ok(version)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::block::BLOCK_MARKER;

	fn empty_header() -> Vec<u8> {
		let mut data = vec![0u8; 0x100];
		data[0] = SESSION_MARKER;
		data
	}

	fn probe_block(content_type: u16, content: &[u8]) -> Vec<u8> {
		let mut out = vec![BLOCK_MARKER, 0x01, 0x00];
		out.extend_from_slice(&(content.len() as u32 + 2).to_le_bytes());
		out.extend_from_slice(&content_type.to_le_bytes());
		out.extend_from_slice(content);
		out
	}

	#[test_log::test]
	fn rejects_files_without_signature() {
		let data = vec![0u8; 0x100];
		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap_err().code(), -2);
	}

	#[test_log::test]
	fn accepts_bitcode_without_marker() {
		let mut data = vec![0u8; 0x100];
		data[1..1 + BITCODE.len()].copy_from_slice(BITCODE);
		data[0x40] = 10;

		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap(), 10);
	}

	#[test_log::test]
	fn modern_probe_block_is_off_by_two() {
		let mut content = vec![0u8; 18];
		content.extend_from_slice(&10u32.to_le_bytes());

		let mut data = empty_header();
		let block = probe_block(0x2067, &content);
		data[PROBE_BLOCK_POS as usize..PROBE_BLOCK_POS as usize + block.len()]
			.copy_from_slice(&block);

		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap(), 12);
	}

	#[test_log::test]
	fn legacy_probe_block_trails_the_product_string() {
		let mut content = vec![0u8; 1];
		content.extend_from_slice(&2u32.to_le_bytes());
		content.extend_from_slice(b"PT");
		content.extend_from_slice(&[0u8; 4]);
		content.extend_from_slice(&9u32.to_le_bytes());

		let mut data = empty_header();
		let block = probe_block(0x0003, &content);
		data[PROBE_BLOCK_POS as usize..PROBE_BLOCK_POS as usize + block.len()]
			.copy_from_slice(&block);

		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap(), 9);
	}

	#[test_log::test]
	fn fallback_chain_takes_first_nonzero() {
		let mut data = empty_header();
		data[0x3D] = 7;
		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap(), 7);

		let mut data = empty_header();
		data[0x3A] = 4;
		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap(), 6);
	}

	#[test_log::test]
	fn gates_on_supported_versions() {
		let mut data = empty_header();
		data[0x40] = 13;
		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap_err().code(), -3);

		let mut data = empty_header();
		data[0x40] = 4;
		let reader = SessionReader::new(&data, Endianness::Little);
		assert_eq!(probe(&reader).unwrap_err().code(), -3);
	}
}
