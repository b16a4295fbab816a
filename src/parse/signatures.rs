use crate::block::{Block, ContentKind};
use crate::error::Result;
use crate::macros::parse_err;
use crate::reader::SessionReader;
use crate::session::timeline::{
	KeySignature, KeySignatureEvent, TimeSignature, TimeSignatureEvent,
};
use crate::util::ticks;

/// Fixed key signature record size
const KEY_RECORD_SIZE: u32 = 13;

const TIME_HEADER_SIZE: u32 = 17;
const TIME_EVENT_SIZE: u32 = 36;

/// Extract key signature records
pub(crate) fn parse_key_signatures(
	reader: &SessionReader<'_>,
	blocks: &[Block],
) -> Result<Vec<KeySignatureEvent>> {
	let mut events = Vec::new();

	for block in blocks
		.iter()
		.filter(|block| block.is(ContentKind::KeySignatureList))
	{
		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::KeySignatureRecord))
		{
			let Some(event) = parse_key_signature(reader, child) else {
				parse_err!(@BAIL KeySignatures, "Malformed key signature record");
			};
			events.push(event);
		}
	}

	Ok(events)
}

fn parse_key_signature(reader: &SessionReader<'_>, block: &Block) -> Option<KeySignatureEvent> {
	if block.size < KEY_RECORD_SIZE {
		return None;
	}

	let mut pos = block.offset + 2;
	let raw_pos = reader.u64_at(pos)?;
	pos += 8;
	let is_major = reader.byte_at(pos)?;
	pos += 1;
	let is_sharp = reader.byte_at(pos)?;
	pos += 1;
	let sign_count = reader.byte_at(pos)?;

	if is_major > 1 || is_sharp > 1 || sign_count > 7 {
		return None;
	}

	Some(KeySignatureEvent {
		pos: ticks::from_epoch(raw_pos),
		key: KeySignature {
			is_major: is_major == 1,
			is_sharp: is_sharp == 1,
			sign_count,
		},
	})
}

/// Extract time signature events from the first time-signature map
pub(crate) fn parse_time_signatures(
	reader: &SessionReader<'_>,
	blocks: &[Block],
) -> Result<Vec<TimeSignatureEvent>> {
	let Some(block) = blocks
		.iter()
		.find(|block| block.is(ContentKind::TimeSignatureMap))
	else {
		return Ok(Vec::new());
	};

	if block.size < TIME_HEADER_SIZE {
		parse_err!(@BAIL TimeSignatures, "Time signature map too small");
	}

	let mut pos = block.offset + 13;
	let Some(event_count) = reader.u32_at(pos) else {
		parse_err!(@BAIL TimeSignatures, "Truncated time signature map");
	};
	pos += 4;

	let needed = u64::from(TIME_HEADER_SIZE) + u64::from(event_count) * u64::from(TIME_EVENT_SIZE);
	if u64::from(block.size) < needed {
		parse_err!(@BAIL TimeSignatures, "Time signature map truncates its events");
	}

	let mut events = Vec::with_capacity(event_count as usize);
	for _ in 0..event_count {
		let (Some(raw_pos), Some(measure), Some(numerator), Some(denominator)) = (
			reader.u64_at(pos),
			reader.u32_at(pos + 8),
			reader.u32_at(pos + 12),
			reader.u32_at(pos + 16),
		) else {
			parse_err!(@BAIL TimeSignatures, "Truncated time signature event");
		};
		pos += 20 + 16;

		if !(1..=99).contains(&numerator) {
			parse_err!(@BAIL TimeSignatures, "Time signature numerator out of range");
		}
		if denominator == 0 || denominator > 64 || !denominator.is_power_of_two() {
			parse_err!(@BAIL TimeSignatures, "Time signature denominator is not a power of two");
		}

		events.push(TimeSignatureEvent {
			pos: ticks::unbias(raw_pos),
			measure,
			signature: TimeSignature {
				numerator: numerator as u8,
				denominator: denominator as u8,
			},
		});
	}

	Ok(events)
}
