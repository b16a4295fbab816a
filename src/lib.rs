//! Read Pro Tools® session files.
//!
//! Session files are scrambled on disk and carry a tree of typed blocks
//! describing the whole production: referenced audio files, audio and MIDI
//! clips, tracks, session metadata, and the musical timeline (key signatures,
//! time signatures, tempo changes). This crate descrambles the file, decodes
//! the block tree, extracts all of the above, and derives timeline analysis
//! from it — sample-accurate clip coverage and the "main" tempo, key, and
//! meter of the session.
//!
//! Reading is the whole story: nothing here writes or repairs session files,
//! and referenced audio is never opened.
//!
//! # Examples
//!
//! ```rust,no_run
//! # fn main() -> ptsession::error::Result<()> {
//! let session = ptsession::read_from_path("my song.ptx")?;
//!
//! println!("version {}", session.version());
//! println!("{} Hz / {}-bit", session.session_rate(), session.bit_depth());
//!
//! for track in session.tracks() {
//! 	println!("{}: {} clips", track.name(), track.regions().len());
//! }
//!
//! if let Some(tempo) = session.main_tempo() {
//! 	println!("mostly {tempo} BPM");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Load failures are categorized, see
//! [`PtError::code`](crate::error::PtError::code).

pub mod block;
pub mod error;
pub(crate) mod macros;
pub mod session;

mod analysis;
mod descramble;
mod parse;
mod reader;
mod util;
mod version;

pub use session::{SessionFile, read_from, read_from_path};
