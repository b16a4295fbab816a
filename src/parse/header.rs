use crate::block::{Block, ContentKind};
use crate::error::Result;
use crate::macros::parse_err;
use crate::reader::SessionReader;

#[derive(Debug)]
pub(crate) struct Header {
	pub(crate) bit_depth: u8,
	pub(crate) session_rate: u32,
}

/// Extract bit depth and session rate
///
/// The sample-rate info block carries both; a general-info block overrides
/// the bit depth when present, which is how 32-bit float sessions report
/// their real depth.
pub(crate) fn parse(reader: &SessionReader<'_>, blocks: &[Block]) -> Result<Header> {
	let mut header: Option<Header> = None;
	let mut depth_override = 0u8;

	for block in blocks {
		if block.is(ContentKind::SampleRateInfo) {
			let bit_depth = reader.byte_at(block.offset + 3);
			let session_rate = reader.u32_at(block.offset + 4);
			let (Some(bit_depth), Some(session_rate)) = (bit_depth, session_rate) else {
				parse_err!(@BAIL Header, "Truncated sample rate info block");
			};

			header = Some(Header {
				bit_depth,
				session_rate,
			});
		} else if block.is(ContentKind::GeneralInfo) {
			depth_override = reader.byte_at(block.offset + 6).unwrap_or(0);
		}
	}

	let Some(mut header) = header else {
		parse_err!(@BAIL Header, "No sample rate info block");
	};

	if depth_override != 0 {
		header.bit_depth = depth_override;
	}

	Ok(header)
}
