//! Derived timeline analysis
//!
//! Everything here is a pure function of the parsed model: tick positions are
//! converted to sample positions through the tempo map, region coverage is
//! merged into disjoint sample ranges, and the "main" tempo/key/meter is the
//! value in force for the largest share of covered samples.

use crate::session::region::{Region, RegionRange};
use crate::session::timeline::TempoChange;
use crate::session::track::Track;
use crate::util::math::RoundedDivision;
use crate::util::ticks::TICKS_PER_QUARTER;

/// Tick→sample conversion anchored in the parsed tempo changes
///
/// A session without tempo events plays at the default 120 BPM, so an empty
/// map synthesizes a single change saying exactly that.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TempoMap {
	changes: Vec<TempoChange>,
	session_rate: u32,
}

pub(crate) const DEFAULT_TEMPO: f64 = 120.0;

impl TempoMap {
	pub(crate) fn new(mut changes: Vec<TempoChange>, session_rate: u32) -> Self {
		if changes.is_empty() {
			changes.push(TempoChange {
				pos: 0,
				pos_in_samples: 0,
				tempo: DEFAULT_TEMPO,
				beat_length: TICKS_PER_QUARTER,
			});
		}

		Self {
			changes,
			session_rate,
		}
	}

	pub(crate) fn changes(&self) -> &[TempoChange] {
		&self.changes
	}

	/// Convert a tick position to a sample position
	///
	/// Monotone non-decreasing in its input.
	pub(crate) fn tick_to_samples(&self, pos: u64) -> u64 {
		let upper = self.changes.partition_point(|change| change.pos <= pos);
		let anchor = &self.changes[upper.saturating_sub(1)];
		samples_from_anchor(anchor, pos, self.session_rate)
	}
}

/// Sample position of `pos`, measured from the given tempo change
///
/// Rounding is half-away-from-zero, matching the format's own conversions.
pub(crate) fn samples_from_anchor(anchor: &TempoChange, pos: u64, session_rate: u32) -> u64 {
	let beats = pos.saturating_sub(anchor.pos) as f64 / anchor.beat_length as f64;
	let samples = (beats * f64::from(session_rate) * 60.0 / anchor.tempo).round();

	anchor.pos_in_samples.saturating_add(samples as u64)
}

/// Collect and merge the sample ranges covered by the given tracks
///
/// Per track, an earlier clip is truncated to the next clip's start; the
/// union over all tracks is then sorted and overlapping intervals merged, so
/// the result is sorted and pairwise disjoint.
pub(crate) fn region_ranges<'a>(
	tracks: impl Iterator<Item = &'a Track>,
	tempo_map: &TempoMap,
) -> Vec<RegionRange> {
	let mut ranges = Vec::new();
	for track in tracks {
		collect_track_ranges(&mut ranges, track.regions(), tempo_map);
	}

	ranges.sort_by_key(|range| range.start);
	merge_ranges(ranges)
}

fn collect_track_ranges(out: &mut Vec<RegionRange>, regions: &[Region], tempo_map: &TempoMap) {
	let mut intervals = regions
		.iter()
		.map(|region| clip_range(region, tempo_map))
		.collect::<Vec<_>>();
	intervals.sort_by_key(|range| range.start);

	// A clip ends early when the next clip on the track covers it
	for i in 0..intervals.len() {
		if let Some(next_start) = intervals.get(i + 1).map(|next| next.start) {
			let interval = &mut intervals[i];
			interval.end = interval.end.min(next_start.max(interval.start));
		}
	}

	out.extend(intervals);
}

fn clip_range(region: &Region, tempo_map: &TempoMap) -> RegionRange {
	let start = region.start();
	let length = region.length();

	if region.is_start_in_ticks() {
		RegionRange {
			start: tempo_map.tick_to_samples(start),
			end: tempo_map.tick_to_samples(start.saturating_add(length)),
		}
	} else {
		RegionRange {
			start,
			end: start.saturating_add(length),
		}
	}
}

fn merge_ranges(sorted: Vec<RegionRange>) -> Vec<RegionRange> {
	let mut merged: Vec<RegionRange> = Vec::with_capacity(sorted.len());
	for range in sorted {
		match merged.last_mut() {
			Some(last) if last.end >= range.start => last.end = last.end.max(range.end),
			_ => merged.push(range),
		}
	}

	merged
}

/// Pick the event value in force for the largest share of covered samples
///
/// `events` are (sample position, value) pairs in non-decreasing position
/// order; the first event is considered in force from the session start.
/// Ties are broken towards the value seen first.
///
/// With no coverage at all there is nothing to weigh and the first event
/// value wins.
pub(crate) fn main_event_value<V>(events: &[(u64, V)], ranges: &[RegionRange]) -> Option<V>
where
	V: Clone + PartialEq,
{
	if events.is_empty() {
		return None;
	}

	let mut totals: Vec<(V, u64)> = Vec::new();
	let mut in_force = 0usize;
	for range in ranges {
		while in_force + 1 < events.len() && events[in_force + 1].0 <= range.start {
			in_force += 1;
		}

		let mut cursor = range.start;
		loop {
			let next_pos = events.get(in_force + 1).map_or(u64::MAX, |event| event.0);
			let segment_end = range.end.min(next_pos);
			if segment_end > cursor {
				accumulate(&mut totals, &events[in_force].1, segment_end - cursor);
			}

			// Carry the remainder of the range into the next event segment
			if range.end > next_pos {
				in_force += 1;
				cursor = next_pos;
			} else {
				break;
			}
		}
	}

	if totals.is_empty() {
		return events.first().map(|(_, value)| value.clone());
	}

	let mut best: Option<(V, u64)> = None;
	for (value, total) in totals {
		if best.as_ref().map_or(true, |(_, best_total)| total > *best_total) {
			best = Some((value, total));
		}
	}

	best.map(|(value, _)| value)
}

fn accumulate<V: PartialEq>(totals: &mut Vec<(V, u64)>, value: &V, amount: u64)
where
	V: Clone,
{
	match totals.iter_mut().find(|(seen, _)| seen == value) {
		Some((_, total)) => *total += amount,
		None => totals.push((value.clone(), amount)),
	}
}

/// Length in whole seconds of the longest run of coverage whose internal gaps
/// never exceed `max_gap_secs`
pub(crate) fn music_duration_secs(
	ranges: &[RegionRange],
	session_rate: u32,
	max_gap_secs: u8,
) -> u32 {
	let max_gap = u64::from(max_gap_secs) * u64::from(session_rate);

	let mut best = 0u64;
	let mut aggregate = 0u64;
	let mut last_end: Option<u64> = None;
	for range in ranges {
		if let Some(last_end) = last_end {
			let gap = range.start.saturating_sub(last_end);
			if gap > max_gap {
				best = best.max(aggregate);
				aggregate = 0;
			} else {
				aggregate += gap;
			}
		}

		aggregate += range.len();
		last_end = Some(range.end);
	}

	best = best.max(aggregate);
	best.div_round(u64::from(session_rate)) as u32
}
