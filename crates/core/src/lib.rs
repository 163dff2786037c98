//! Core library for the fireworks show player.
//!
//! A show is a [`Program`] of timed firing events. The [`ShowEngine`] plays
//! it frame by frame: the scheduler decides which events are due, each due
//! event ignites a particle effect, and effects draw themselves onto a
//! [`Surface`] until they burn out. Sounds go through a [`SoundBank`].

pub mod audio;
pub mod config;
pub mod error;
pub mod explosion;
pub mod glyph;
pub mod particles;
pub mod program;
pub mod record;
pub mod render;
pub mod show;
pub mod timeline;

pub use audio::{PreloadReport, SampleBank, SoundBank, SoundClip, SoundCue};
pub use config::{ShowConfig, REFERENCE_FRAME_MS};
pub use error::{Result, ShowError};
pub use explosion::{Effect, Explosion, Fountain, GlyphPhase, GlyphShell, RadialBurst};
pub use glyph::{BitmapFont, GlyphRaster, GlyphRasterizer, RasterRequest};
pub use program::{FireKind, FiringEvent, Position, Program, ProgramDocument, SoundId};
pub use record::{CueRecord, Recorder, RecordingSettings, RecordingSummary};
pub use render::{Canvas, DrawLog, Rgba, Surface};
pub use show::ShowEngine;
pub use timeline::{FireCommand, PlaybackClock, PlaybackSession, Scheduler};
