//! Contains the errors that can arise within ptsession
//!
//! The primary error is [`PtError`]. The type of error is determined by [`ErrorKind`].
//! Every error also maps onto the numeric load contract via [`PtError::code`].

use std::collections::TryReserveError;
use std::fmt::{Debug, Display, Formatter};

/// Alias for `Result<T, PtError>`
pub type Result<T> = std::result::Result<T, PtError>;

/// The types of errors that can occur
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	/// The file could not be descrambled (too short, unknown scramble scheme, ...)
	Descramble(&'static str),
	/// The file is not a recognized session (marker byte and bitcode both absent)
	NotASession,
	/// The session was written by an unsupported program version
	UnsupportedVersion(u8),
	/// The session rate is outside the supported range
	SessionRate(u32),
	/// Errors that occur while extracting the session model from the block tree
	Parse(ParseError),

	// Conversions for external errors
	/// Represents all cases of [`std::io::Error`]
	Io(std::io::Error),
	/// Failure to allocate enough memory
	Alloc(TryReserveError),
}

/// The extraction stage a [`ParseError`] arose in
///
/// Each stage corresponds to one of the categorized load failures, see
/// [`PtError::code`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ParseStage {
	/// Sample rate / bit depth header
	Header,
	/// The audio file table
	AudioFiles,
	/// Audio regions, tracks, and their associations
	Arrangement,
	/// MIDI chunks, regions, and their track bindings
	Midi,
	/// The base64-packed session metadata
	Metadata,
	/// Key signature records
	KeySignatures,
	/// Time signature records
	TimeSignatures,
	/// Tempo change records
	TempoChanges,
}

impl Display for ParseStage {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Header => write!(f, "Header"),
			Self::AudioFiles => write!(f, "Audio files"),
			Self::Arrangement => write!(f, "Arrangement"),
			Self::Midi => write!(f, "MIDI"),
			Self::Metadata => write!(f, "Metadata"),
			Self::KeySignatures => write!(f, "Key signatures"),
			Self::TimeSignatures => write!(f, "Time signatures"),
			Self::TempoChanges => write!(f, "Tempo changes"),
		}
	}
}

/// An error that arises while extracting the session model
pub struct ParseError {
	stage: ParseStage,
	description: &'static str,
}

impl ParseError {
	/// Create a `ParseError` from a [`ParseStage`] and description
	#[must_use]
	pub const fn new(stage: ParseStage, description: &'static str) -> Self {
		Self { stage, description }
	}

	/// Returns the [`ParseStage`] the error arose in
	pub fn stage(&self) -> ParseStage {
		self.stage
	}

	/// Returns the error description
	pub fn description(&self) -> &str {
		self.description
	}
}

impl Debug for ParseError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}: {:?}", self.stage, self.description)
	}
}

impl Display for ParseError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.stage, self.description)
	}
}

/// The error type of ptsession
pub struct PtError {
	kind: ErrorKind,
}

impl PtError {
	/// Create a `PtError` from an [`ErrorKind`]
	#[must_use]
	pub const fn new(kind: ErrorKind) -> Self {
		Self { kind }
	}

	/// Returns the [`ErrorKind`]
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	/// Returns the categorized load failure code
	///
	/// | Code | Condition |
	/// |------|-----------|
	/// | -1   | Descrambling failed (unreadable, too short, OOM, unknown scramble scheme) |
	/// | -2   | Not a recognized session |
	/// | -3   | Unsupported version |
	/// | -4   | Header parse failed |
	/// | -5   | Session rate out of range |
	/// | -6   | Audio file table malformed |
	/// | -7   | Region/track resolution failed |
	/// | -8   | MIDI parse failed |
	/// | -9   | Metadata parse failed |
	/// | -10  | Key signature parse failed |
	/// | -11  | Time signature parse failed |
	/// | -12  | Tempo change parse failed |
	pub fn code(&self) -> i32 {
		match &self.kind {
			ErrorKind::Descramble(_) | ErrorKind::Io(_) | ErrorKind::Alloc(_) => -1,
			ErrorKind::NotASession => -2,
			ErrorKind::UnsupportedVersion(_) => -3,
			ErrorKind::SessionRate(_) => -5,
			ErrorKind::Parse(parse_error) => match parse_error.stage() {
				ParseStage::Header => -4,
				ParseStage::AudioFiles => -6,
				ParseStage::Arrangement => -7,
				ParseStage::Midi => -8,
				ParseStage::Metadata => -9,
				ParseStage::KeySignatures => -10,
				ParseStage::TimeSignatures => -11,
				ParseStage::TempoChanges => -12,
			},
		}
	}
}

impl From<ParseError> for PtError {
	fn from(input: ParseError) -> Self {
		Self {
			kind: ErrorKind::Parse(input),
		}
	}
}

impl From<std::io::Error> for PtError {
	fn from(input: std::io::Error) -> Self {
		Self {
			kind: ErrorKind::Io(input),
		}
	}
}

impl From<TryReserveError> for PtError {
	fn from(input: TryReserveError) -> Self {
		Self {
			kind: ErrorKind::Alloc(input),
		}
	}
}

impl Debug for PtError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.kind)
	}
}

impl Display for PtError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match &self.kind {
			ErrorKind::Descramble(reason) => write!(f, "Failed to descramble session: {reason}"),
			ErrorKind::NotASession => write!(f, "File is not a recognized session"),
			ErrorKind::UnsupportedVersion(version) => {
				write!(f, "Unsupported session version ({version}), expected 5..=12")
			},
			ErrorKind::SessionRate(rate) => {
				write!(f, "Session rate ({rate} Hz) outside of 44100..=192000")
			},
			ErrorKind::Parse(parse_error) => write!(f, "{parse_error}"),
			ErrorKind::Io(err) => write!(f, "{err}"),
			ErrorKind::Alloc(err) => write!(f, "{err}"),
		}
	}
}

impl std::error::Error for PtError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match &self.kind {
			ErrorKind::Io(err) => Some(err),
			ErrorKind::Alloc(err) => Some(err),
			_ => None,
		}
	}
}
