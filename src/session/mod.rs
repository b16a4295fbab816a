//! The parsed session model
//!
//! [`SessionFile`] owns everything extracted from one session file: the
//! descrambled bytes, the decoded block tree, the semantic collections, and
//! the lazily derived timeline views. All of it is immutable after load.

pub mod audio;
pub mod metadata;
pub mod region;
pub mod timeline;
pub mod track;

pub use audio::AudioFile;
pub use metadata::Metadata;
pub use region::{MidiEvent, Region, RegionContent, RegionRange};
pub use timeline::{
	KeySignature, KeySignatureEvent, TempoChange, TimeSignature, TimeSignatureEvent,
};
pub use track::Track;

use crate::analysis::{self, TempoMap};
use crate::block::{self, Block};
use crate::descramble;
use crate::error::Result;
use crate::parse;
use crate::reader::SessionReader;
use crate::version;

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

/// Read a session file from a path
///
/// # Errors
///
/// See [`PtError::code`](crate::error::PtError::code) for the full failure
/// taxonomy.
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> ptsession::error::Result<()> {
/// let session = ptsession::read_from_path("my song.ptx")?;
///
/// println!(
/// 	"{} Hz, {} tracks",
/// 	session.session_rate(),
/// 	session.tracks().len()
/// );
/// # Ok(())
/// # }
/// ```
pub fn read_from_path(path: impl AsRef<Path>) -> Result<SessionFile> {
	SessionFile::read_from_path(path)
}

/// Read a session from an open reader
///
/// The reader must yield the scrambled on-disk bytes from the start of the
/// file.
///
/// # Errors
///
/// Same as [`read_from_path`].
pub fn read_from<R>(reader: &mut R) -> Result<SessionFile>
where
	R: Read,
{
	SessionFile::read_from(reader)
}

/// A fully parsed session file
#[derive(Debug)]
pub struct SessionFile {
	version: u8,
	bit_depth: u8,
	session_rate: u32,
	data: Vec<u8>,
	blocks: Vec<Block>,
	audio_files: Vec<AudioFile>,
	regions: Vec<Region>,
	midi_regions: Vec<Region>,
	tracks: Vec<Track>,
	midi_tracks: Vec<Track>,
	metadata_base64: Vec<u8>,
	metadata: Metadata,
	key_signatures: Vec<KeySignatureEvent>,
	time_signatures: Vec<TimeSignatureEvent>,
	tempo_changes: Vec<TempoChange>,
	tempo_map: TempoMap,
	region_ranges: OnceLock<Vec<RegionRange>>,
}

impl SessionFile {
	/// Read a session file from a path
	///
	/// # Errors
	///
	/// See [`PtError::code`](crate::error::PtError::code).
	pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self> {
		let data = descramble::read_from_path(path.as_ref())?;
		Self::from_descrambled(data)
	}

	/// Read a session from an open reader
	///
	/// # Errors
	///
	/// See [`PtError::code`](crate::error::PtError::code).
	pub fn read_from<R>(reader: &mut R) -> Result<Self>
	where
		R: Read,
	{
		let mut data = Vec::new();
		reader.read_to_end(&mut data)?;

		Self::from_descrambled(descramble::descramble(data)?)
	}

	fn from_descrambled(data: Vec<u8>) -> Result<Self> {
		let endianness = version::detect_endianness(&data);
		let reader = SessionReader::new(&data, endianness);

		let version = version::probe(&reader)?;
		let blocks = block::decode_forest(&reader);
		let parsed = parse::parse(&reader, &blocks, version)?;
		let tempo_map = TempoMap::new(parsed.tempo_changes.clone(), parsed.session_rate);

		Ok(Self {
			version,
			bit_depth: parsed.bit_depth,
			session_rate: parsed.session_rate,
			data,
			blocks,
			audio_files: parsed.audio_files,
			regions: parsed.regions,
			midi_regions: parsed.midi_regions,
			tracks: parsed.tracks,
			midi_tracks: parsed.midi_tracks,
			metadata_base64: parsed.metadata_base64,
			metadata: parsed.metadata,
			key_signatures: parsed.key_signatures,
			time_signatures: parsed.time_signatures,
			tempo_changes: parsed.tempo_changes,
			tempo_map,
			region_ranges: OnceLock::new(),
		})
	}

	/// The format version (5..=12)
	pub fn version(&self) -> u8 {
		self.version
	}

	/// The session sample rate in Hz (44100..=192000)
	pub fn session_rate(&self) -> u32 {
		self.session_rate
	}

	/// The session bit depth
	pub fn bit_depth(&self) -> u8 {
		self.bit_depth
	}

	/// The whole descrambled file
	pub fn unxored_data(&self) -> &[u8] {
		&self.data
	}

	/// The decoded metadata payload bytes, empty when the session carries none
	pub fn metadata_base64(&self) -> &[u8] {
		&self.metadata_base64
	}

	/// The parsed session metadata
	pub fn metadata(&self) -> &Metadata {
		&self.metadata
	}

	/// The decoded top-level block forest
	pub fn blocks(&self) -> &[Block] {
		&self.blocks
	}

	/// The audio file table
	pub fn audio_files(&self) -> &[AudioFile] {
		&self.audio_files
	}

	/// All audio regions, in definition order
	pub fn regions(&self) -> &[Region] {
		&self.regions
	}

	/// All MIDI regions, in definition order
	pub fn midi_regions(&self) -> &[Region] {
		&self.midi_regions
	}

	/// Audio tracks and their bound regions
	pub fn tracks(&self) -> &[Track] {
		&self.tracks
	}

	/// MIDI tracks and their bound regions
	pub fn midi_tracks(&self) -> &[Track] {
		&self.midi_tracks
	}

	/// Key signature changes, in file order
	pub fn key_signatures(&self) -> &[KeySignatureEvent] {
		&self.key_signatures
	}

	/// Time signature changes, in file order
	pub fn time_signatures(&self) -> &[TimeSignatureEvent] {
		&self.time_signatures
	}

	/// Tempo changes, in non-decreasing tick order
	pub fn tempo_changes(&self) -> &[TempoChange] {
		&self.tempo_changes
	}

	/// The merged sample ranges covered by any region
	///
	/// Sorted by start and pairwise disjoint. Computed once on first call.
	pub fn region_ranges(&self) -> &[RegionRange] {
		self.region_ranges.get_or_init(|| {
			analysis::region_ranges(
				self.tracks.iter().chain(self.midi_tracks.iter()),
				&self.tempo_map,
			)
		})
	}

	/// The key signature in force for most of the covered timeline
	pub fn main_key_signature(&self) -> Option<KeySignature> {
		let events = self
			.key_signatures
			.iter()
			.map(|event| (self.tempo_map.tick_to_samples(event.pos()), event.key()))
			.collect::<Vec<_>>();

		analysis::main_event_value(&events, self.region_ranges())
	}

	/// The time signature in force for most of the covered timeline
	pub fn main_time_signature(&self) -> Option<TimeSignature> {
		let events = self
			.time_signatures
			.iter()
			.map(|event| {
				(
					self.tempo_map.tick_to_samples(event.pos()),
					event.signature(),
				)
			})
			.collect::<Vec<_>>();

		analysis::main_event_value(&events, self.region_ranges())
	}

	/// The tempo in force for most of the covered timeline
	///
	/// Sessions without tempo events resolve to the 120 BPM default.
	pub fn main_tempo(&self) -> Option<f64> {
		let events = self
			.tempo_map
			.changes()
			.iter()
			.map(|change| (change.pos_in_samples(), change.tempo()))
			.collect::<Vec<_>>();

		analysis::main_event_value(&events, self.region_ranges())
	}

	/// Length in whole seconds of the longest musical stretch
	///
	/// Gaps of up to `max_gap_secs` between covered ranges are counted as
	/// music; a longer gap starts a new stretch.
	pub fn music_duration_secs(&self, max_gap_secs: u8) -> u32 {
		analysis::music_duration_secs(self.region_ranges(), self.session_rate, max_gap_secs)
	}
}
