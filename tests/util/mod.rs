//! A byte-level session file builder for the integration tests
//!
//! Files are assembled as plaintext blocks and scrambled on build, so every
//! test exercises the real descrambling path.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const ZERO_TICKS: u64 = 0xE8_D4A5_1000;
pub const TICKS_PER_QUARTER: u64 = 960_000;

const BLOCK_MARKER: u8 = 0x5A;
const BITCODE: &[u8] = b"0010111100101011";

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Endian {
	Little,
	Big,
}

pub struct SessionBuilder {
	endian: Endian,
	scramble_type: u8,
	scramble_value: u8,
	body: Vec<u8>,
}

impl SessionBuilder {
	/// Little-endian file with the legacy scramble scheme
	pub fn little() -> Self {
		Self {
			endian: Endian::Little,
			scramble_type: 0x01,
			scramble_value: 53,
			body: Vec::new(),
		}
	}

	/// Big-endian file with the modern scramble scheme
	pub fn big() -> Self {
		Self {
			endian: Endian::Big,
			scramble_type: 0x05,
			scramble_value: 11,
			body: Vec::new(),
		}
	}

	pub fn scramble(mut self, scramble_type: u8, scramble_value: u8) -> Self {
		self.scramble_type = scramble_type;
		self.scramble_value = scramble_value;
		self
	}

	// ---- primitive encoders ----

	pub fn u16(&self, value: u16) -> Vec<u8> {
		match self.endian {
			Endian::Little => value.to_le_bytes().to_vec(),
			Endian::Big => value.to_be_bytes().to_vec(),
		}
	}

	pub fn u32(&self, value: u32) -> Vec<u8> {
		match self.endian {
			Endian::Little => value.to_le_bytes().to_vec(),
			Endian::Big => value.to_be_bytes().to_vec(),
		}
	}

	pub fn u40(&self, value: u64) -> Vec<u8> {
		match self.endian {
			Endian::Little => value.to_le_bytes()[..5].to_vec(),
			Endian::Big => value.to_be_bytes()[3..].to_vec(),
		}
	}

	pub fn u64(&self, value: u64) -> Vec<u8> {
		match self.endian {
			Endian::Little => value.to_le_bytes().to_vec(),
			Endian::Big => value.to_be_bytes().to_vec(),
		}
	}

	pub fn string(&self, value: &str) -> Vec<u8> {
		let mut out = self.u32(value.len() as u32);
		out.extend_from_slice(value.as_bytes());
		out
	}

	pub fn block(&self, content_type: u16, content: &[u8]) -> Vec<u8> {
		let mut out = vec![BLOCK_MARKER];
		out.extend(self.u16(0x0001));
		out.extend(self.u32(content.len() as u32 + 2));
		out.extend(self.u16(content_type));
		out.extend_from_slice(content);
		out
	}

	/// A packed three-point record, all widths 5
	pub fn three_point(&self, offset: u64, length: u64, start: u64) -> Vec<u8> {
		let mut out = vec![0u8; 5];
		match self.endian {
			Endian::Little => {
				out[1] = 0x50;
				out[2] = 0x50;
				out[3] = 0x50;
			},
			Endian::Big => {
				out[2] = 0x50;
				out[3] = 0x50;
				out[4] = 0x50;
			},
		}

		// Values are little-endian regardless of the file order
		for value in [offset, length, start] {
			out.extend_from_slice(&value.to_le_bytes()[..5]);
		}
		out
	}

	pub fn push_block(&mut self, block: Vec<u8>) -> &mut Self {
		self.body.extend(block);
		self
	}

	// ---- composite blocks ----

	pub fn version_block_modern(&self, raw_version: u32) -> Vec<u8> {
		let mut content = vec![0u8; 18];
		content.extend(self.u32(raw_version));
		self.block(0x2067, &content)
	}

	pub fn version_block_legacy(&self, product: &str, version: u32) -> Vec<u8> {
		let mut content = vec![0u8; 1];
		content.extend(self.string(product));
		content.extend_from_slice(&[0u8; 4]);
		content.extend(self.u32(version));
		self.block(0x0003, &content)
	}

	pub fn header_block(&self, bit_depth: u8, session_rate: u32) -> Vec<u8> {
		let mut content = vec![0u8, bit_depth];
		content.extend(self.u32(session_rate));
		self.block(0x1028, &content)
	}

	pub fn general_info_block(&self, bit_depth: u8) -> Vec<u8> {
		self.block(0x204B, &[0, 0, 0, 0, bit_depth])
	}

	/// The wav list: named entries plus a parallel length table
	pub fn wav_list_block(
		&self,
		wav_count: u32,
		entries: &[(&str, &[u8; 4])],
		lengths: &[u64],
	) -> Vec<u8> {
		let mut names = vec![0u8; 9];
		for (name, type_tag) in entries {
			names.extend(self.string(name));
			names.extend_from_slice(*type_tag);
			names.extend_from_slice(&[0u8; 5]);
		}

		let mut meta = vec![0u8; 2];
		for length in lengths {
			let mut info = vec![0u8; 6];
			info.extend(self.u64(*length));
			meta.extend(self.block(0x1001, &info));
		}

		let mut content = self.u32(wav_count);
		content.extend(self.block(0x103A, &names));
		content.extend(self.block(0x1003, &meta));
		self.block(0x1004, &content)
	}

	/// One audio region: name, three-point fields, and the file index that
	/// trails the region's sub-block
	pub fn audio_region(
		&self,
		name_type: u16,
		name: &str,
		sample_offset: u64,
		length: u64,
		start: u64,
		file_index: u32,
	) -> Vec<u8> {
		let mut content = vec![0u8; 9];
		content.extend(self.string(name));
		content.extend(self.three_point(sample_offset, length, start));
		content.extend(self.block(0x1009, &[]));
		content.extend(self.u32(file_index));
		self.block(name_type, &content)
	}

	pub fn audio_region_list_block(&self, list_type: u16, regions: &[Vec<u8>]) -> Vec<u8> {
		let mut content = vec![0u8; 4];
		for region in regions {
			content.extend_from_slice(region);
		}
		self.block(list_type, &content)
	}

	pub fn track_list_block(&self, tracks: &[(&str, &[u16])]) -> Vec<u8> {
		let mut content = vec![0u8; 2];
		for (name, channels) in tracks {
			let mut track = self.string(name);
			track.push(0);
			track.extend(self.u32(channels.len() as u32));
			for channel in *channels {
				track.extend(self.u16(*channel));
			}
			content.extend(self.block(0x1014, &track));
		}
		self.block(0x1015, &content)
	}

	/// The v5 association family: the k-th entry binds regions to track k
	pub fn bindings_block_v5(&self, slots: &[&[u32]]) -> Vec<u8> {
		let mut content = vec![0u8; 2];
		for regions in slots {
			let mut subs = Vec::new();
			for region_index in *regions {
				let mut sub = vec![0u8; 2];
				sub.extend(self.u32(*region_index));
				subs.extend(self.block(0x100E, &sub));
			}

			let mut entries = self.string("");
			entries.extend(self.block(0x100F, &subs));
			content.extend(self.block(0x1011, &entries));
		}
		self.block(0x1012, &content)
	}

	/// The v8+ association family, with start overrides and fade flags
	pub fn bindings_block_v8(&self, slots: &[&[(u32, u32, bool)]]) -> Vec<u8> {
		let mut content = vec![0u8; 2];
		for bindings in slots {
			let mut entries = self.string("");
			for (region_index, start, is_fade) in *bindings {
				let mut sub = vec![0u8; 2];
				sub.extend(self.u32(*region_index));
				sub.push(0);
				sub.extend(self.u32(*start));

				let mut entry = vec![0u8; 45];
				entry[44] = u8::from(*is_fade);
				entry.extend(self.block(0x104F, &sub));
				entries.extend(self.block(0x1050, &entry));
			}
			content.extend(self.block(0x1052, &entries));
		}
		self.block(0x1054, &content)
	}

	/// Raw MIDI chunk: the zero anchor aliases the first event's position
	pub fn midi_events_block(&self, events: &[(u64, u8, u64, u8)]) -> Vec<u8> {
		let mut content = b"MdNLB".to_vec();
		content.extend_from_slice(&[0u8; 6]);
		content.extend(self.u32(events.len() as u32));

		for (pos, note, length, velocity) in events {
			let mut event = self.u40(*pos);
			event.extend_from_slice(&[0u8; 3]);
			event.push(*note);
			event.extend(self.u40(*length));
			event.extend_from_slice(&[0u8; 3]);
			event.push(*velocity);
			event.extend_from_slice(&[0u8; 17]);
			assert_eq!(event.len(), 35);
			content.extend(event);
		}

		self.block(0x2000, &content)
	}

	pub fn midi_region_map_block(&self, map_type: [u16; 3], regions: &[(&str, u32)]) -> Vec<u8> {
		let mut entries = Vec::new();
		for (name, chunk_index) in regions {
			let mut region = self.string(name);
			region.extend_from_slice(&[0u8; 20]);
			entries.extend(self.block(map_type[2], &region));
			entries.extend(self.u32(*chunk_index));
		}

		let child = self.block(map_type[1], &entries);
		self.block(map_type[0], &child)
	}

	pub fn midi_track_list_block(&self, names: &[&str]) -> Vec<u8> {
		let mut content = vec![0u8; 2];
		for name in names {
			let mut track = vec![0u8; 2];
			track.extend(self.string(name));
			content.extend(self.block(0x251A, &track));
		}
		self.block(0x2519, &content)
	}

	pub fn midi_bindings_block(&self, slots: &[&[(u32, u64)]]) -> Vec<u8> {
		let mut content = vec![0u8; 2];
		for bindings in slots {
			let mut entries = Vec::new();
			for (region_index, raw_start) in *bindings {
				let mut sub = vec![0u8; 2];
				sub.extend(self.u32(*region_index));
				sub.push(0);
				sub.extend(self.u40(*raw_start));
				let entry = self.block(0x104F, &sub);
				entries.extend(self.block(0x1056, &entry));
			}
			content.extend(self.block(0x1057, &entries));
		}
		self.block(0x1058, &content)
	}

	pub fn key_signatures_block(&self, records: &[(u64, u8, u8, u8)]) -> Vec<u8> {
		let mut content = vec![0u8; 2];
		for (pos, is_major, is_sharp, sign_count) in records {
			let mut record = self.u64(*pos);
			record.extend_from_slice(&[*is_major, *is_sharp, *sign_count]);
			content.extend(self.block(0x2432, &record));
		}
		self.block(0x2433, &content)
	}

	pub fn time_signatures_block(&self, events: &[(u64, u32, u32, u32)]) -> Vec<u8> {
		let mut content = vec![0u8; 11];
		content.extend(self.u32(events.len() as u32));
		for (pos, measure, numerator, denominator) in events {
			content.extend(self.u64(*pos));
			content.extend(self.u32(*measure));
			content.extend(self.u32(*numerator));
			content.extend(self.u32(*denominator));
			content.extend_from_slice(&[0u8; 16]);
		}
		self.block(0x2029, &content)
	}

	pub fn tempo_block(&self, events: &[(u64, f64, u64)]) -> Vec<u8> {
		let mut content = vec![0u8; 11];
		content.extend(self.u32(events.len() as u32));
		for (pos, tempo, beat_length) in events {
			let mut event = vec![0u8; 4];
			event.extend_from_slice(b"Const");
			event.extend_from_slice(&[0x01, 0x00, 0x2E, 0x00, 0x00, 0x00]);
			event.extend_from_slice(b"TMS");
			event.extend_from_slice(&[0x01, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00, 0x01]);
			event.extend_from_slice(&[0u8; 8]);
			assert_eq!(event.len(), 34);

			event.extend(self.u64(*pos));
			event.extend_from_slice(&[0u8; 2]);
			event.extend(self.u64(tempo.to_bits()));
			event.extend(self.u64(*beat_length));
			event.push(0);
			assert_eq!(event.len(), 61);
			content.extend(event);
		}
		self.block(0x2028, &content)
	}

	/// The metadata block: a struct payload, base64-encoded and laid out in
	/// 64-character groups with 2 pad bytes in-between
	pub fn metadata_block(&self, payload: &[u8]) -> Vec<u8> {
		let text = data_encoding::BASE64.encode(payload);

		let mut grouped = Vec::new();
		let mut chunks = text.as_bytes().chunks(64).peekable();
		while let Some(chunk) = chunks.next() {
			grouped.extend_from_slice(chunk);
			if chunks.peek().is_some() {
				grouped.extend_from_slice(&[0, 0]);
			}
		}

		let mut content = self.string("sessionMetadataBase64");
		content.extend(self.u32(grouped.len() as u32));
		content.extend_from_slice(&grouped);

		let child = self.block(0x2715, &content);
		self.block(0x2716, &child)
	}

	pub fn metadata_string_field(&self, name: &str, value: &str) -> Vec<u8> {
		let mut out = self.string(name);
		out.extend(self.u32(0));
		out.extend(self.string(value));
		out
	}

	pub fn metadata_struct(&self, fields: &[Vec<u8>]) -> Vec<u8> {
		let mut out = self.u32(1);
		out.extend(self.u32(fields.len() as u32));
		for field in fields {
			out.extend_from_slice(field);
		}
		out
	}

	/// An unknown filler block, useful for pushing content past 0x1000 so the
	/// modern keystream indexing leaves the zero key
	pub fn pad_block(&self, len: usize) -> Vec<u8> {
		self.block(0x2511, &vec![0u8; len])
	}

	// ---- assembly ----

	pub fn build(&self) -> Vec<u8> {
		let mut file = vec![0u8; 0x1F];
		file[0] = 0x03;
		file[1..1 + BITCODE.len()].copy_from_slice(BITCODE);
		file[0x11] = u8::from(self.endian == Endian::Big);
		file[0x12] = self.scramble_type;
		file[0x13] = self.scramble_value;
		file.extend_from_slice(&self.body);

		scramble_in_place(&mut file, self.scramble_type, self.scramble_value);
		file
	}

	pub fn write_temp(&self) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(&self.build()).unwrap();
		file.flush().unwrap();
		file
	}
}

fn scramble_in_place(file: &mut [u8], scramble_type: u8, scramble_value: u8) {
	let (multiplier, negative) = match scramble_type {
		0x01 => (53u8, false),
		0x05 => (11u8, true),
		_ => return,
	};

	let mut delta = 0u8;
	for i in 0..=u8::MAX {
		if i.wrapping_mul(multiplier) == scramble_value {
			delta = if negative { i.wrapping_neg() } else { i };
			break;
		}
	}

	let mut keystream = [0u8; 256];
	for (i, key) in keystream.iter_mut().enumerate() {
		*key = (i as u8).wrapping_mul(delta);
	}

	for (pos, byte) in file.iter_mut().enumerate().skip(0x14) {
		let index = if scramble_type == 0x01 {
			pos & 0xFF
		} else {
			(pos >> 12) & 0xFF
		};
		*byte ^= keystream[index];
	}
}
