//! Musical timeline events
//!
//! Positions are in 960 000 PPQN ticks since session start. With a 4/4 time
//! signature, the second measure starts at 3 840 000 ticks.

/// A key signature value
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KeySignature {
	pub(crate) is_major: bool,
	pub(crate) is_sharp: bool,
	pub(crate) sign_count: u8,
}

impl KeySignature {
	/// Major scale (otherwise minor)
	pub fn is_major(&self) -> bool {
		self.is_major
	}

	/// Sharp alterations (otherwise flat)
	pub fn is_sharp(&self) -> bool {
		self.is_sharp
	}

	/// Number of alteration signs (0..=7)
	pub fn sign_count(&self) -> u8 {
		self.sign_count
	}
}

/// A key signature change on the timeline
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeySignatureEvent {
	pub(crate) pos: u64,
	pub(crate) key: KeySignature,
}

impl KeySignatureEvent {
	/// Position in ticks
	pub fn pos(&self) -> u64 {
		self.pos
	}

	/// The key signature in force from this position
	pub fn key(&self) -> KeySignature {
		self.key
	}
}

/// A time signature value
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TimeSignature {
	pub(crate) numerator: u8,
	pub(crate) denominator: u8,
}

impl TimeSignature {
	/// Beats per measure (1..=99)
	pub fn numerator(&self) -> u8 {
		self.numerator
	}

	/// Beat unit, a power of two up to 64
	pub fn denominator(&self) -> u8 {
		self.denominator
	}
}

/// A time signature change on the timeline
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSignatureEvent {
	pub(crate) pos: u64,
	pub(crate) measure: u32,
	pub(crate) signature: TimeSignature,
}

impl TimeSignatureEvent {
	/// Position in ticks
	pub fn pos(&self) -> u64 {
		self.pos
	}

	/// The measure number the change falls on
	pub fn measure(&self) -> u32 {
		self.measure
	}

	/// The time signature in force from this position
	pub fn signature(&self) -> TimeSignature {
		self.signature
	}
}

/// A tempo change on the timeline
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TempoChange {
	pub(crate) pos: u64,
	pub(crate) pos_in_samples: u64,
	pub(crate) tempo: f64,
	pub(crate) beat_length: u64,
}

impl TempoChange {
	/// Position in ticks
	pub fn pos(&self) -> u64 {
		self.pos
	}

	/// Position in samples, derived from the preceding tempo changes
	pub fn pos_in_samples(&self) -> u64 {
		self.pos_in_samples
	}

	/// Tempo in BPM (5.0..=500.0)
	pub fn tempo(&self) -> f64 {
		self.tempo
	}

	/// Beat length in ticks, always a multiple of a 1/32 note (120 000)
	pub fn beat_length(&self) -> u64 {
		self.beat_length
	}
}
