use crate::block::{Block, ContentKind};
use crate::error::Result;
use crate::macros::parse_err;
use crate::reader::SessionReader;
use crate::session::region::{MidiEvent, Region, RegionContent};
use crate::session::track::Track;
use crate::util::ticks;

/// Magic prefix of every raw MIDI chunk
const CHUNK_MAGIC: &[u8] = b"MdNLB";
/// Bytes per serialized note event
const EVENT_SIZE: u32 = 35;

/// A raw MIDI chunk; regions reference chunks by index
struct MidiChunk {
	max_len: u64,
	events: Vec<MidiEvent>,
}

/// Extract MIDI chunks and regions, and bind regions onto the seeded tracks
pub(crate) fn parse(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	mut midi_tracks: Vec<Track>,
) -> Result<(Vec<Region>, Vec<Track>)> {
	let chunks = parse_chunks(reader, blocks);

	let mut midi_regions = parse_regions(reader, blocks, &chunks)?;
	parse_compound_regions(reader, blocks, &chunks, &mut midi_regions)?;
	bind_tracks(reader, blocks, &midi_regions, &mut midi_tracks);

	midi_tracks.retain(|track| !track.regions.is_empty());

	Ok((midi_regions, midi_tracks))
}

fn parse_chunks(reader: &SessionReader<'_>, blocks: &[Block]) -> Vec<MidiChunk> {
	let mut chunks = Vec::new();

	for block in blocks
		.iter()
		.filter(|block| block.is(ContentKind::MidiEventsBlock))
	{
		let mut pos = block.offset;

		while pos + EVENT_SIZE < block.end() {
			let Some(magic) = reader.find(CHUNK_MAGIC, pos, reader.len()) else {
				break;
			};
			pos = magic + 11;

			let Some(event_count) = reader.u32_at(pos) else {
				break;
			};
			pos += 4;

			// The zero anchor aliases the first event's position field
			let Some(zero) = reader.u40_at(pos) else {
				break;
			};

			let mut events = Vec::new();
			let mut max_len = 0u64;
			let mut remaining = event_count;
			while remaining > 0 && pos < reader.len() {
				let (Some(raw_pos), Some(note), Some(length), Some(velocity)) = (
					reader.u40_at(pos),
					reader.byte_at(pos + 8),
					reader.u40_at(pos + 9),
					reader.byte_at(pos + 17),
				) else {
					break;
				};

				if raw_pos < zero {
					log::warn!("MIDI event position {raw_pos:#x} precedes its chunk anchor");
				}
				let event_pos = raw_pos.saturating_sub(zero);
				max_len = max_len.max(event_pos + length);

				events.push(MidiEvent {
					pos: event_pos,
					length,
					note,
					velocity,
				});

				pos += EVENT_SIZE;
				remaining -= 1;
			}

			chunks.push(MidiChunk { max_len, events });
		}
	}

	chunks
}

fn parse_regions(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	chunks: &[MidiChunk],
) -> Result<Vec<Region>> {
	let mut regions = Vec::new();

	for block in blocks.iter().filter(|block| {
		block.is(ContentKind::MidiRegionMapV5) || block.is(ContentKind::MidiRegionMapV10)
	}) {
		for child in block.children().iter().filter(|child| {
			child.is(ContentKind::MidiRegionNameV5) || child.is(ContentKind::MidiRegionNameV10)
		}) {
			for entry in child.children().iter().filter(|entry| {
				entry.is(ContentKind::MidiRegionName) || entry.is(ContentKind::CompoundRegionGroup)
			}) {
				let Some(name) = reader.string_at(entry.offset + 2) else {
					continue;
				};

				let Some(chunk_index) = reader.u32_at(entry.end()) else {
					continue;
				};
				let Some(chunk) = chunks.get(chunk_index as usize) else {
					parse_err!(@BAIL Midi, "MIDI region references a missing chunk");
				};

				let index = regions.len() as u16;
				regions.push(midi_region(name, index, chunk));
			}
		}
	}

	Ok(regions)
}

/// Compound region groups; plain groups double as MIDI regions
fn parse_compound_regions(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	chunks: &[MidiChunk],
	regions: &mut Vec<Region>,
) -> Result<()> {
	for block in blocks
		.iter()
		.filter(|block| block.is(ContentKind::CompoundRegionMap))
	{
		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::CompoundRegionFullMap))
		{
			for group in child
				.children()
				.iter()
				.filter(|group| group.is(ContentKind::CompoundRegionGroup))
			{
				let Some(name) = reader.string_at(group.offset + 2) else {
					continue;
				};

				// Groups with compound elements are not unpacked yet; only
				// the plain ones are placeable regions
				let is_compound = group
					.children()
					.iter()
					.any(|element| element.is(ContentKind::CompoundRegionElement));
				if is_compound {
					log::debug!("Skipping compound MIDI region {name:?}");
					continue;
				}

				let Some(chunk_index) = reader.u16_at(group.end() + 2) else {
					continue;
				};
				let Some(chunk) = chunks.get(chunk_index as usize) else {
					parse_err!(@BAIL Midi, "Compound group references a missing chunk");
				};

				regions.push(midi_region(name, chunk_index, chunk));
			}
		}
	}

	Ok(())
}

fn midi_region(name: String, index: u16, chunk: &MidiChunk) -> Region {
	// Unbound regions sit at the tick epoch until a track binding places them
	Region {
		name,
		index,
		start: 0,
		content: RegionContent::Midi {
			events: chunk.events.clone(),
			length: chunk.max_len,
			is_start_in_ticks: true,
		},
	}
}

fn bind_tracks(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	regions: &[Region],
	tracks: &mut [Track],
) {
	for block in blocks
		.iter()
		.filter(|block| block.is(ContentKind::MidiRegionTrackMap))
	{
		let mut slot = 0u16;

		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::MidiRegionTrackEntries))
		{
			for entry in child
				.children()
				.iter()
				.filter(|entry| entry.is(ContentKind::MidiRegionTrackEntry))
			{
				for sub in entry
					.children()
					.iter()
					.filter(|sub| sub.is(ContentKind::RegionTrackSubEntry))
				{
					let Some(region_index) = reader.u32_at(sub.offset + 4) else {
						continue;
					};
					let Some(raw_start) = reader.u40_at(sub.offset + 9) else {
						continue;
					};

					let Some(track) = tracks.iter_mut().find(|track| track.index == slot) else {
						continue;
					};
					let Some(region) = regions
						.iter()
						.find(|region| region.index == region_index as u16)
					else {
						continue;
					};

					let (start, in_ticks) = ticks::classify_start(raw_start);
					let mut region = region.clone();
					region.start = start;
					if let RegionContent::Midi {
						is_start_in_ticks, ..
					} = &mut region.content
					{
						*is_start_in_ticks = in_ticks;
					}

					track.regions.push(region);
				}
			}

			slot += 1;
		}
	}
}
