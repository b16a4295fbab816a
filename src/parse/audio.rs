use crate::block::{Block, ContentKind};
use crate::error::Result;
use crate::macros::parse_err;
use crate::reader::SessionReader;
use crate::session::audio::AudioFile;

const TYPE_TAGS: [&[u8; 4]; 4] = [b"WAVE", b"EVAW", b"AIFF", b"FFIA"];

/// Extract the audio file table
///
/// Names come from the wav-name children of the wav list, filtered down to
/// real audio files; lengths are zipped on afterwards from the wav-meta
/// children, in table order.
pub(crate) fn parse(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	version: u8,
) -> Result<Vec<AudioFile>> {
	let mut files: Vec<AudioFile> = Vec::new();
	let mut wav_count = 0u32;

	for block in blocks.iter().filter(|block| block.is(ContentKind::WavList)) {
		wav_count = reader.u32_at(block.offset + 2).unwrap_or(0);

		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::WavNames))
		{
			let mut pos = child.offset + 11;
			while pos < child.end() && (files.len() as u32) < wav_count {
				let (Some(raw_len), Some(filename)) =
					(reader.u32_at(pos), reader.string_at(pos))
				else {
					break;
				};
				pos += raw_len + 4;

				let type_tag = reader.slice(pos, 4).unwrap_or_default();
				pos += 9;

				if !accept_file(&filename, type_tag, version) {
					continue;
				}

				let mut file = AudioFile::new(files.len() as u16);
				file.filename = filename;
				files.push(file);
			}
		}
	}

	if files.is_empty() {
		if wav_count > 0 {
			parse_err!(@BAIL AudioFiles, "Wav list names no readable audio files");
		}

		return Ok(files);
	}

	// Zip the lengths on, in table order
	let mut remaining = files.iter_mut();
	for block in blocks.iter().filter(|block| block.is(ContentKind::WavList)) {
		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::WavMeta))
		{
			for entry in child
				.children()
				.iter()
				.filter(|entry| entry.is(ContentKind::WavSampleRateSize))
			{
				let Some(file) = remaining.next() else {
					break;
				};
				file.length = reader.u64_at(entry.offset + 8).unwrap_or(0);
			}
		}
	}

	Ok(files)
}

fn accept_file(filename: &str, type_tag: &[u8], version: u8) -> bool {
	// Group clips and the session's own folders show up in the name table
	if filename.contains(".grp")
		|| filename.contains("Audio Files")
		|| filename.contains("Fade Files")
	{
		return false;
	}

	let tag_matches = TYPE_TAGS.iter().any(|tag| type_tag == *tag);
	if version < 10 {
		return tag_matches;
	}

	// Newer sessions may leave the tag empty and rely on the extension
	if type_tag.first() != Some(&0) {
		tag_matches
	} else {
		filename.contains(".wav") || filename.contains(".aif")
	}
}
