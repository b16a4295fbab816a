use super::read_three_point;
use crate::block::{Block, ContentKind};
use crate::error::Result;
use crate::macros::parse_err;
use crate::reader::SessionReader;
use crate::session::audio::AudioFile;
use crate::session::region::{Region, RegionContent};
use crate::session::track::Track;

const MAX_CHANNELS_PER_TRACK: u32 = 8;

pub(crate) struct Arrangement {
	pub(crate) regions: Vec<Region>,
	pub(crate) tracks: Vec<Track>,
	/// MIDI tracks seeded from the track list; their regions are bound later
	pub(crate) midi_tracks: Vec<Track>,
}

/// Extract audio regions, tracks, and the region→track bindings
///
/// The MIDI track list is interleaved here because it is derived from the
/// audio track list: an entry that names an existing audio track is the audio
/// track itself, anything else is a MIDI track.
pub(crate) fn parse(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	audio_files: &[AudioFile],
) -> Result<Arrangement> {
	let mut found = false;

	let regions = parse_regions(reader, blocks, audio_files, &mut found);
	let mut tracks = parse_tracks(reader, blocks);
	let midi_tracks = seed_midi_tracks(reader, blocks, &tracks);
	bind_regions(reader, blocks, &regions, &mut tracks, &mut found);

	if !found {
		parse_err!(@BAIL Arrangement, "No region or track association blocks");
	}

	// Tracks that never received a region carry nothing of interest
	tracks.retain(|track| !track.regions.is_empty());

	Ok(Arrangement {
		regions,
		tracks,
		midi_tracks,
	})
}

fn parse_regions(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	audio_files: &[AudioFile],
	found: &mut bool,
) -> Vec<Region> {
	let mut regions = Vec::new();

	for block in blocks.iter().filter(|block| {
		block.is(ContentKind::AudioRegionList) || block.is(ContentKind::AudioRegionListV10)
	}) {
		*found = true;

		for child in block.children().iter().filter(|child| {
			child.is(ContentKind::AudioRegionName) || child.is(ContentKind::AudioRegionNameV10)
		}) {
			// The first sub-block's payload end is where the file index lives
			let Some(sub) = child.children().first() else {
				continue;
			};

			let mut pos = child.offset + 11;
			let (Some(raw_len), Some(name)) = (reader.u32_at(pos), reader.string_at(pos)) else {
				continue;
			};
			pos += raw_len + 4;

			let three_point = read_three_point(reader, pos);
			let file_index = reader.u32_at(sub.end()).unwrap_or(0) as u16;

			let mut wave = AudioFile::new(file_index);
			wave.abs_pos = three_point.start;
			wave.length = three_point.length;
			if let Some(named) = audio_files.iter().find(|file| file.index == file_index) {
				wave.filename = named.filename.clone();
			}

			regions.push(Region {
				name,
				index: regions.len() as u16,
				start: three_point.start,
				content: RegionContent::Audio {
					wave,
					sample_offset: three_point.offset,
					length: three_point.length,
				},
			});
		}
	}

	regions
}

fn parse_tracks(reader: &SessionReader<'_>, blocks: &[Block]) -> Vec<Track> {
	let mut tracks: Vec<Track> = Vec::new();

	for block in blocks
		.iter()
		.filter(|block| block.is(ContentKind::AudioTracks))
	{
		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::AudioTrackNameNumber))
		{
			let mut pos = child.offset + 2;
			let (Some(raw_len), Some(name)) = (reader.u32_at(pos), reader.string_at(pos)) else {
				continue;
			};
			pos += raw_len + 5;

			let channel_count = reader.u32_at(pos).unwrap_or(0);
			pos += 4;

			// Every channel-map entry is its own track index
			for _ in 0..channel_count.min(MAX_CHANNELS_PER_TRACK) {
				let Some(channel) = reader.u16_at(pos) else {
					break;
				};
				pos += 2;

				if !tracks.iter().any(|track| track.index == channel) {
					tracks.push(Track::new(channel, name.clone()));
				}
			}
		}
	}

	tracks
}

fn seed_midi_tracks(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	audio_tracks: &[Track],
) -> Vec<Track> {
	let mut midi_tracks = Vec::new();

	for block in blocks
		.iter()
		.filter(|block| block.is(ContentKind::MidiTrackList))
	{
		let mut track_ordinal = 0u16;
		let mut midi_ordinal = 0u16;

		for child in block
			.children()
			.iter()
			.filter(|child| child.is(ContentKind::MidiTrackNameNumber))
		{
			let Some(name) = reader.string_at(child.offset + 4) else {
				continue;
			};

			let is_audio_track = audio_tracks
				.iter()
				.find(|track| track.index == track_ordinal)
				.is_some_and(|track| name.contains(&track.name));
			if !is_audio_track {
				midi_tracks.push(Track::new(midi_ordinal, name));
				midi_ordinal += 1;
			}

			track_ordinal += 1;
		}
	}

	midi_tracks
}

fn bind_regions(
	reader: &SessionReader<'_>,
	blocks: &[Block],
	regions: &[Region],
	tracks: &mut [Track],
	found: &mut bool,
) {
	for block in blocks {
		if block.is(ContentKind::AudioRegionTrackMap) {
			let mut slot = 0u16;
			for child in block
				.children()
				.iter()
				.filter(|child| child.is(ContentKind::AudioRegionTrackEntries))
			{
				*found = true;

				for entry in child
					.children()
					.iter()
					.filter(|entry| entry.is(ContentKind::AudioRegionTrackEntry))
				{
					for sub in entry
						.children()
						.iter()
						.filter(|sub| sub.is(ContentKind::AudioRegionTrackSlot))
					{
						let Some(region_index) = reader.u32_at(sub.offset + 4) else {
							continue;
						};
						bind_region(tracks, slot, regions, region_index as u16, None);
					}
				}

				slot += 1;
			}
		} else if block.is(ContentKind::RegionTrackMap) {
			let mut slot = 0u16;
			for child in block
				.children()
				.iter()
				.filter(|child| child.is(ContentKind::RegionTrackEntries))
			{
				*found = true;

				for entry in child
					.children()
					.iter()
					.filter(|entry| entry.is(ContentKind::RegionTrackEntry))
				{
					// Fades are bound like regions but are not clips
					if reader.byte_at(entry.offset + 46) == Some(0x01) {
						continue;
					}

					for sub in entry
						.children()
						.iter()
						.filter(|sub| sub.is(ContentKind::RegionTrackSubEntry))
					{
						let Some(region_index) = reader.u32_at(sub.offset + 4) else {
							continue;
						};
						let Some(start) = reader.u32_at(sub.offset + 9) else {
							continue;
						};
						bind_region(
							tracks,
							slot,
							regions,
							region_index as u16,
							Some(u64::from(start)),
						);
					}
				}

				slot += 1;
			}
		}
	}
}

fn bind_region(
	tracks: &mut [Track],
	track_index: u16,
	regions: &[Region],
	region_index: u16,
	start: Option<u64>,
) {
	let Some(track) = tracks.iter_mut().find(|track| track.index == track_index) else {
		return;
	};
	let Some(region) = regions.iter().find(|region| region.index == region_index) else {
		return;
	};

	let mut region = region.clone();
	if let Some(start) = start {
		region.start = start;
	}
	track.regions.push(region);
}
