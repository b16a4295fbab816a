//! The typed block tree
//!
//! A session body is a forest of length-prefixed typed blocks. Each block
//! carries a content-type discriminator and may contain nested child blocks,
//! found by scanning the parent's payload for the block marker.

mod read;

pub(crate) use read::{block_at, decode_forest};

/// Every block starts with this marker byte
pub(crate) const BLOCK_MARKER: u8 = 0x5A;

/// A single node of the block tree
///
/// `offset` is the file position of the content-type field; the payload ends
/// `size` bytes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
	pub(crate) block_type: u16,
	pub(crate) size: u32,
	pub(crate) content_type: u16,
	pub(crate) offset: u32,
	pub(crate) children: Vec<Block>,
}

impl Block {
	/// The block's type field
	pub fn block_type(&self) -> u16 {
		self.block_type
	}

	/// Payload size in bytes, counted from [`Block::offset`]
	pub fn size(&self) -> u32 {
		self.size
	}

	/// The raw content-type discriminator
	pub fn content_type(&self) -> u16 {
		self.content_type
	}

	/// File offset of the content-type field
	pub fn offset(&self) -> u32 {
		self.offset
	}

	/// File offset one past the end of the payload
	pub(crate) fn end(&self) -> u32 {
		self.offset + self.size
	}

	/// Child blocks, in file order
	pub fn children(&self) -> &[Block] {
		&self.children
	}

	/// The known content kind, if any
	pub fn content_kind(&self) -> Option<ContentKind> {
		ContentKind::from_raw(self.content_type)
	}

	pub(crate) fn is(&self, kind: ContentKind) -> bool {
		self.content_type == kind as u16
	}
}

/// The known content-type discriminators
///
/// The catalog covers every discriminator observed across format versions 5
/// through 12; blocks with other discriminators are kept in the tree but have
/// no semantic meaning to this crate.
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u16)]
pub enum ContentKind {
	ProductVersion = 0x0003,
	ProductVersionInfo = 0x0030,
	WavSampleRateSize = 0x1001,
	WavMeta = 0x1003,
	WavList = 0x1004,
	MidiRegionName = 0x1007,
	AudioRegionName = 0x1008,
	AudioRegionList = 0x100B,
	AudioRegionTrackSlot = 0x100E,
	AudioRegionTrackEntry = 0x100F,
	AudioRegionTrackEntries = 0x1011,
	AudioRegionTrackMap = 0x1012,
	AudioTrackNameNumber = 0x1014,
	AudioTracks = 0x1015,
	PluginEntry = 0x1017,
	PluginList = 0x1018,
	IoChannelEntry = 0x1021,
	IoChannelList = 0x1022,
	SampleRateInfo = 0x1028,
	WavNames = 0x103A,
	RegionTrackSubEntry = 0x104F,
	RegionTrackEntry = 0x1050,
	RegionTrackEntries = 0x1052,
	RegionTrackMap = 0x1054,
	MidiRegionTrackEntry = 0x1056,
	MidiRegionTrackEntries = 0x1057,
	MidiRegionTrackMap = 0x1058,
	MidiEventsBlock = 0x2000,
	MidiRegionNameV5 = 0x2001,
	MidiRegionMapV5 = 0x2002,
	TempoMap = 0x2028,
	TimeSignatureMap = 0x2029,
	GeneralInfo = 0x204B,
	SessionPathInfo = 0x2067,
	KeySignatureRecord = 0x2432,
	KeySignatureList = 0x2433,
	Snaps = 0x2511,
	MidiTrackList = 0x2519,
	MidiTrackNameNumber = 0x251A,
	CompoundRegionElement = 0x2523,
	IoRoute = 0x2602,
	IoRoutingTable = 0x2603,
	CompoundRegionGroup = 0x2628,
	AudioRegionNameV10 = 0x2629,
	AudioRegionListV10 = 0x262A,
	CompoundRegionFullMap = 0x262B,
	CompoundRegionMap = 0x262C,
	MidiRegionNameV10 = 0x2633,
	MidiRegionMapV10 = 0x2634,
	SessionMetadata = 0x2715,
	SessionMetadataParent = 0x2716,
	MarkerList = 0x271A,
}

impl ContentKind {
	/// Get a `ContentKind` from a raw discriminator
	pub fn from_raw(raw: u16) -> Option<Self> {
		let kind = match raw {
			0x0003 => Self::ProductVersion,
			0x0030 => Self::ProductVersionInfo,
			0x1001 => Self::WavSampleRateSize,
			0x1003 => Self::WavMeta,
			0x1004 => Self::WavList,
			0x1007 => Self::MidiRegionName,
			0x1008 => Self::AudioRegionName,
			0x100B => Self::AudioRegionList,
			0x100E => Self::AudioRegionTrackSlot,
			0x100F => Self::AudioRegionTrackEntry,
			0x1011 => Self::AudioRegionTrackEntries,
			0x1012 => Self::AudioRegionTrackMap,
			0x1014 => Self::AudioTrackNameNumber,
			0x1015 => Self::AudioTracks,
			0x1017 => Self::PluginEntry,
			0x1018 => Self::PluginList,
			0x1021 => Self::IoChannelEntry,
			0x1022 => Self::IoChannelList,
			0x1028 => Self::SampleRateInfo,
			0x103A => Self::WavNames,
			0x104F => Self::RegionTrackSubEntry,
			0x1050 => Self::RegionTrackEntry,
			0x1052 => Self::RegionTrackEntries,
			0x1054 => Self::RegionTrackMap,
			0x1056 => Self::MidiRegionTrackEntry,
			0x1057 => Self::MidiRegionTrackEntries,
			0x1058 => Self::MidiRegionTrackMap,
			0x2000 => Self::MidiEventsBlock,
			0x2001 => Self::MidiRegionNameV5,
			0x2002 => Self::MidiRegionMapV5,
			0x2028 => Self::TempoMap,
			0x2029 => Self::TimeSignatureMap,
			0x204B => Self::GeneralInfo,
			0x2067 => Self::SessionPathInfo,
			0x2432 => Self::KeySignatureRecord,
			0x2433 => Self::KeySignatureList,
			0x2511 => Self::Snaps,
			0x2519 => Self::MidiTrackList,
			0x251A => Self::MidiTrackNameNumber,
			0x2523 => Self::CompoundRegionElement,
			0x2602 => Self::IoRoute,
			0x2603 => Self::IoRoutingTable,
			0x2628 => Self::CompoundRegionGroup,
			0x2629 => Self::AudioRegionNameV10,
			0x262A => Self::AudioRegionListV10,
			0x262B => Self::CompoundRegionFullMap,
			0x262C => Self::CompoundRegionMap,
			0x2633 => Self::MidiRegionNameV10,
			0x2634 => Self::MidiRegionMapV10,
			0x2715 => Self::SessionMetadata,
			0x2716 => Self::SessionMetadataParent,
			0x271A => Self::MarkerList,
			_ => return None,
		};

		Some(kind)
	}
}
