use crate::block::{Block, ContentKind};
use crate::error::Result;
use crate::macros::parse_err;
use crate::reader::{Endianness, SessionReader};
use crate::session::metadata::Metadata;

use data_encoding::BASE64;

const PAYLOAD_HEADER: &str = "sessionMetadataBase64";
// Base64 text is laid out in 64-character groups with 2 pad bytes in-between
const GROUP_LEN: u32 = 64;
const GROUP_LEN_WITH_PAD: u32 = GROUP_LEN + 2;

const FIELD_TITLE: &str = "http://purl.org/dc/elements/1.1/:title";
const FIELD_ARTIST: &str = "http://www.id3.org/id3v2.3.0#:TPE1";
const FIELD_CONTRIBUTORS: &str = "http://purl.org/dc/elements/1.1/:contributor";
const FIELD_LOCATION: &str = "http://meta.avid.com/everywhere/1.0#:location";

const MAX_STRUCT_DEPTH: usize = 64;

/// Decode the base64-packed session metadata
///
/// Returns the decoded payload bytes alongside the parsed fields; sessions
/// without a metadata block yield an empty payload and default fields.
pub(crate) fn parse(reader: &SessionReader<'_>, blocks: &[Block]) -> Result<(Vec<u8>, Metadata)> {
	for block in blocks
		.iter()
		.filter(|block| block.is(ContentKind::SessionMetadataParent))
	{
		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::SessionMetadata))
		{
			let payload = decode_payload(reader, child)?;
			let metadata = decode_struct(&payload, reader.endianness())?;
			return Ok((payload, metadata));
		}
	}

	Ok((Vec::new(), Metadata::default()))
}

fn decode_payload(reader: &SessionReader<'_>, block: &Block) -> Result<Vec<u8>> {
	let mut pos = block.offset + 2;

	let (Some(raw_len), Some(header)) = (reader.u32_at(pos), reader.string_at(pos)) else {
		parse_err!(@BAIL Metadata, "Truncated metadata header");
	};
	if !header.contains(PAYLOAD_HEADER) {
		parse_err!(@BAIL Metadata, "Metadata block with an unexpected header");
	}
	pos += raw_len + 4;

	let Some(padded_len) = reader.u32_at(pos) else {
		parse_err!(@BAIL Metadata, "Truncated metadata payload length");
	};
	pos += 4;

	// The last group's character count must come out to whole base64 quads
	let last_group_len = padded_len % GROUP_LEN_WITH_PAD;
	if last_group_len % 4 != 0 {
		parse_err!(@BAIL Metadata, "Base64 payload with a ragged final group");
	}

	let Some(padded) = reader.slice(pos, padded_len) else {
		parse_err!(@BAIL Metadata, "Truncated base64 payload");
	};

	let mut text = Vec::with_capacity(padded.len());
	for group in padded.chunks(GROUP_LEN_WITH_PAD as usize) {
		text.extend_from_slice(&group[..group.len().min(GROUP_LEN as usize)]);
	}

	match BASE64.decode(&text) {
		Ok(payload) => Ok(payload),
		Err(_) => Err(parse_err!(Metadata, "Invalid base64 in metadata payload")),
	}
}

fn decode_struct(payload: &[u8], endianness: Endianness) -> Result<Metadata> {
	let reader = SessionReader::new(payload, endianness);
	let mut metadata = Metadata::default();

	if walk_struct(&reader, 0, None, &mut metadata, 0).is_none() {
		parse_err!(@BAIL Metadata, "Malformed metadata struct");
	}

	Ok(metadata)
}

/// Walk one nested struct, returning the bytes consumed
///
/// Leaf values inside a nested struct are filed under the *outer* field name.
fn walk_struct(
	reader: &SessionReader<'_>,
	start: u32,
	outer_field: Option<&str>,
	out: &mut Metadata,
	depth: usize,
) -> Option<u32> {
	if depth > MAX_STRUCT_DEPTH {
		return None;
	}

	let mut pos = start;

	let head = reader.u32_at(pos)?;
	pos += 4;
	if head != 1 {
		return None;
	}

	let field_count = reader.u32_at(pos)?;
	pos += 4;

	for _ in 0..field_count {
		let name_len = reader.u32_at(pos)?;
		pos += 4;
		let name_bytes = reader.slice(pos, name_len)?;
		pos += name_len;
		// Nested names separate their segments with tabs
		let field = String::from_utf8_lossy(name_bytes).replace('\t', "/");

		let kind = reader.u32_at(pos)?;
		pos += 4;

		match kind {
			// String value
			0 => {
				let value_len = reader.u32_at(pos)?;
				pos += 4;
				let value_bytes = reader.slice(pos, value_len)?;
				pos += value_len;

				let value = String::from_utf8_lossy(value_bytes).into_owned();
				fill_field(out, outer_field.unwrap_or(&field), value);
			},
			// Nested struct
			3 => {
				pos += walk_struct(reader, pos, Some(&field), out, depth + 1)?;
			},
			// Other kinds carry nothing inline
			_ => {},
		}
	}

	Some(pos - start)
}

fn fill_field(out: &mut Metadata, field: &str, value: String) {
	match field {
		FIELD_TITLE => out.title = Some(value),
		FIELD_ARTIST => out.artist = Some(value),
		FIELD_CONTRIBUTORS => out.contributors.push(value),
		FIELD_LOCATION => out.location = Some(value),
		_ => {},
	}
}
