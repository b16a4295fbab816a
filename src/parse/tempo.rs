use crate::analysis;
use crate::block::{Block, ContentKind};
use crate::error::Result;
use crate::macros::parse_err;
use crate::reader::SessionReader;
use crate::session::timeline::TempoChange;
use crate::util::ticks;

const HEADER_SIZE: u32 = 17;
// 34-byte prelude (carrying the "Const" and "TMS" landmarks), u64 position,
// 2 pad, f64 tempo, u64 beat length, 1 pad
const EVENT_SIZE: u32 = 61;
const PRELUDE_SIZE: u32 = 34;

/// Extract tempo changes from the first tempo map
///
/// `pos_in_samples` is derived on the fly: each change is converted through
/// the change preceding it, the first change sits at sample zero.
pub(crate) fn parse(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	session_rate: u32,
) -> Result<Vec<TempoChange>> {
	let Some(block) = blocks.iter().find(|block| block.is(ContentKind::TempoMap)) else {
		return Ok(Vec::new());
	};

	if block.size < HEADER_SIZE {
		parse_err!(@BAIL TempoChanges, "Tempo map too small");
	}

	let mut pos = block.offset + 13;
	let Some(event_count) = reader.u32_at(pos) else {
		parse_err!(@BAIL TempoChanges, "Truncated tempo map");
	};
	pos += 4;

	let needed = u64::from(HEADER_SIZE) + u64::from(event_count) * u64::from(EVENT_SIZE);
	if u64::from(block.size) < needed {
		parse_err!(@BAIL TempoChanges, "Tempo map truncates its events");
	}

	let mut changes: Vec<TempoChange> = Vec::with_capacity(event_count as usize);
	for _ in 0..event_count {
		pos += PRELUDE_SIZE;

		let (Some(raw_pos), Some(tempo_bits), Some(beat_length)) = (
			reader.u64_at(pos),
			reader.u64_at(pos + 10),
			reader.u64_at(pos + 18),
		) else {
			parse_err!(@BAIL TempoChanges, "Truncated tempo change event");
		};
		pos += 27;

		let tempo = f64::from_bits(tempo_bits);
		if !(5.0..=500.0).contains(&tempo) {
			parse_err!(@BAIL TempoChanges, "Tempo out of range");
		}
		// Beat lengths are whole multiples of a 1/32 note
		if beat_length % 120_000 != 0 {
			parse_err!(@BAIL TempoChanges, "Beat length is not a 1/32-note multiple");
		}

		let change_pos = ticks::unbias(raw_pos);
		let pos_in_samples = match changes.last() {
			None => 0,
			Some(previous) => {
				if change_pos < previous.pos {
					parse_err!(@BAIL TempoChanges, "Tempo changes out of order");
				}
				analysis::samples_from_anchor(previous, change_pos, session_rate)
			},
		};

		changes.push(TempoChange {
			pos: change_pos,
			pos_in_samples,
			tempo,
			beat_length,
		});
	}

	Ok(changes)
}
