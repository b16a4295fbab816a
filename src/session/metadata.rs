//! Session metadata

/// Session metadata, decoded from the base64-packed metadata struct
///
/// Every field is optional; sessions written before the metadata editor
/// existed carry none of them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
	pub(crate) title: Option<String>,
	pub(crate) artist: Option<String>,
	pub(crate) contributors: Vec<String>,
	pub(crate) location: Option<String>,
}

impl Metadata {
	/// The session title
	pub fn title(&self) -> Option<&str> {
		self.title.as_deref()
	}

	/// The session artist
	pub fn artist(&self) -> Option<&str> {
		self.artist.as_deref()
	}

	/// All contributors, in file order
	pub fn contributors(&self) -> &[String] {
		&self.contributors
	}

	/// The session location
	pub fn location(&self) -> Option<&str> {
		self.location.as_deref()
	}
}
