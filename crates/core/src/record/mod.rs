use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{audio::SampleBank, render::Canvas, Result, ShowEngine, ShowError};

/// Configuration options for offline rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_dir: PathBuf,
    pub fps: u32,
    /// Total length to render. Defaults to the last event plus `tail_ms`.
    pub duration_ms: Option<u64>,
    /// Time left after the last event for its effect to play out.
    pub tail_ms: u64,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            fps: 60,
            duration_ms: None,
            tail_ms: 7_000,
        }
    }
}

/// Sound cue heard at a given point of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueRecord {
    pub time_ms: f64,
    pub frame: u64,
    pub sound: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub frames: u64,
    pub duration_ms: u64,
    pub cues: Vec<CueRecord>,
}

/// Plays a show against a software canvas at a fixed frame rate and writes
/// every frame as a PNG, plus a `cues.json` listing the sounds triggered.
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    pub fn record(&self, engine: &mut ShowEngine<SampleBank>) -> Result<RecordingSummary> {
        if self.settings.fps == 0 {
            return Err(ShowError::InvalidInput("recording fps must be positive"));
        }
        std::fs::create_dir_all(&self.settings.output_dir)?;

        let duration_ms = self
            .settings
            .duration_ms
            .unwrap_or_else(|| engine.program().last_timing_ms() + self.settings.tail_ms);
        let interval_ms = 1000.0 / self.settings.fps as f64;
        let frames = (duration_ms as f64 / interval_ms).floor() as u64 + 1;

        let canvas_config = &engine.config().canvas;
        let mut canvas = Canvas::new(canvas_config.width, canvas_config.height);
        let mut cues = Vec::new();

        tracing::info!(frames, duration_ms, dir = %self.settings.output_dir.display(), "recording show");
        engine.sounds_mut().take_cues();
        engine.start(0.0);

        for frame in 0..frames {
            let now_ms = frame as f64 * interval_ms;
            engine.frame(now_ms, &mut canvas);
            cues.extend(engine.sounds_mut().take_cues().into_iter().map(|cue| CueRecord {
                time_ms: now_ms,
                frame,
                sound: cue.name,
            }));

            let path = self.settings.output_dir.join(format!("frame_{frame:05}.png"));
            canvas.save_png(&path)?;
        }

        engine.stop(&mut canvas);

        let cue_sheet = serde_json::to_string_pretty(&cues)?;
        std::fs::write(self.settings.output_dir.join("cues.json"), cue_sheet)?;

        Ok(RecordingSummary {
            frames,
            duration_ms,
            cues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::SoundClip,
        config::ShowConfig,
        program::{FireKind, FiringEvent, Program},
    };

    fn small_engine() -> ShowEngine<SampleBank> {
        let mut config = ShowConfig::default();
        config.canvas.width = 64;
        config.canvas.height = 48;

        let mut program = Program::new();
        program.push(FiringEvent::new(0, 100, FireKind::Radial).with_sound("チーン2").with_color("gold"));

        let mut bank = SampleBank::new();
        bank.insert(
            "チーン2",
            SoundClip {
                samples: vec![0.0; 100].into(),
                sample_rate: 1_000,
                channels: 1,
            },
        );
        ShowEngine::with_seed(config, program, bank, 3).unwrap()
    }

    #[test]
    fn writes_frames_and_cue_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(RecordingSettings {
            output_dir: dir.path().to_path_buf(),
            fps: 10,
            duration_ms: Some(500),
            ..RecordingSettings::default()
        });
        let mut engine = small_engine();

        let summary = recorder.record(&mut engine).unwrap();

        assert_eq!(summary.frames, 6);
        assert!(dir.path().join("frame_00000.png").exists());
        assert!(dir.path().join("frame_00005.png").exists());
        assert!(!dir.path().join("frame_00006.png").exists());
        assert_eq!(
            summary.cues,
            vec![CueRecord {
                time_ms: 100.0,
                frame: 1,
                sound: "チーン2".to_string(),
            }]
        );

        let sheet: Vec<CueRecord> =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("cues.json")).unwrap()).unwrap();
        assert_eq!(sheet, summary.cues);
        assert!(!engine.is_playing());

        let frame = image::open(dir.path().join("frame_00001.png")).unwrap().to_rgba8();
        assert_eq!(frame.dimensions(), (64, 48));
        assert!(frame.pixels().any(|pixel| pixel.0[0] > 0));
    }

    #[test]
    fn default_duration_covers_the_last_event() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(RecordingSettings {
            output_dir: dir.path().to_path_buf(),
            fps: 5,
            duration_ms: None,
            tail_ms: 400,
        });
        let mut engine = small_engine();

        let summary = recorder.record(&mut engine).unwrap();
        assert_eq!(summary.duration_ms, 500);
        assert_eq!(summary.frames, 3);
    }

    #[test]
    fn rejects_zero_fps() {
        let recorder = Recorder::new(RecordingSettings {
            fps: 0,
            ..RecordingSettings::default()
        });
        assert!(recorder.record(&mut small_engine()).is_err());
    }
}
