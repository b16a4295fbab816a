//! Semantic extraction from the block tree
//!
//! Each submodule walks the top-level block forest for one concern and maps
//! its failures onto one categorized load error. Blocks that merely look
//! wrong are skipped (landmark parsing); values that violate the format's
//! numeric constraints are hard failures.

pub(crate) mod arrangement;
pub(crate) mod audio;
pub(crate) mod header;
pub(crate) mod metadata;
pub(crate) mod midi;
pub(crate) mod signatures;
pub(crate) mod tempo;

use crate::block::Block;
use crate::error::Result;
use crate::macros::err;
use crate::reader::{Endianness, SessionReader};
use crate::session::audio::AudioFile;
use crate::session::metadata::Metadata;
use crate::session::region::Region;
use crate::session::timeline::{KeySignatureEvent, TempoChange, TimeSignatureEvent};
use crate::session::track::Track;

/// Everything extracted from the block tree
pub(crate) struct ParsedSession {
	pub(crate) bit_depth: u8,
	pub(crate) session_rate: u32,
	pub(crate) audio_files: Vec<AudioFile>,
	pub(crate) regions: Vec<Region>,
	pub(crate) midi_regions: Vec<Region>,
	pub(crate) tracks: Vec<Track>,
	pub(crate) midi_tracks: Vec<Track>,
	pub(crate) metadata_base64: Vec<u8>,
	pub(crate) metadata: Metadata,
	pub(crate) key_signatures: Vec<KeySignatureEvent>,
	pub(crate) time_signatures: Vec<TimeSignatureEvent>,
	pub(crate) tempo_changes: Vec<TempoChange>,
}

pub(crate) fn parse(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	version: u8,
) -> Result<ParsedSession> {
	let header = header::parse(reader, blocks)?;
	if !(44_100..=192_000).contains(&header.session_rate) {
		err!(SessionRate(header.session_rate));
	}

	let audio_files = audio::parse(reader, blocks, version)?;
	let arrangement = arrangement::parse(reader, blocks, &audio_files)?;
	let (midi_regions, midi_tracks) = midi::parse(reader, blocks, arrangement.midi_tracks)?;
	let (metadata_base64, metadata) = metadata::parse(reader, blocks)?;
	let key_signatures = signatures::parse_key_signatures(reader, blocks)?;
	let time_signatures = signatures::parse_time_signatures(reader, blocks)?;
	let tempo_changes = tempo::parse(reader, blocks, header.session_rate)?;

	Ok(ParsedSession {
		bit_depth: header.bit_depth,
		session_rate: header.session_rate,
		audio_files,
		regions: arrangement.regions,
		midi_regions,
		tracks: arrangement.tracks,
		midi_tracks,
		metadata_base64,
		metadata,
		key_signatures,
		time_signatures,
		tempo_changes,
	})
}

/// The recurring 15-byte packed (offset, length, start) tuple
///
/// Three high nibbles give the byte widths of the three values; the values
/// follow in file order and are little-endian even in big-endian files.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct ThreePoint {
	pub(crate) offset: u64,
	pub(crate) length: u64,
	pub(crate) start: u64,
}

pub(crate) fn read_three_point(reader: &SessionReader<'_>, pos: u32) -> ThreePoint {
	let width_at = |at: u32| u32::from(reader.byte_at(at).unwrap_or(0) >> 4);

	// Big-endian files mirror the width nibbles
	let (offset_width, length_width) = match reader.endianness() {
		Endianness::Little => (width_at(pos + 1), width_at(pos + 2)),
		Endianness::Big => (width_at(pos + 4), width_at(pos + 3)),
	};

	let mut j = pos;
	let offset = read_point(reader, j + 5, offset_width);
	j += offset_width;
	let length = read_point(reader, j + 5, length_width);
	j += length_width;
	// Quirk: `start` is read with the *length* width. The start nibble
	// (at +3 little-endian, +2 big-endian) never drives a read; observed
	// files round-trip this way, so it stays.
	let start = read_point(reader, j + 5, length_width);

	ThreePoint {
		offset,
		length,
		start,
	}
}

fn read_point(reader: &SessionReader<'_>, pos: u32, width: u32) -> u64 {
	match width {
		1..=5 => reader.uint_le_at(pos, width as usize).unwrap_or(0),
		_ => 0,
	}
}
