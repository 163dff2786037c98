use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{program::SoundId, Result};

/// Mapping from sound identifier to playable audio.
///
/// Both operations are best-effort: a bank never fails the show. Missing or
/// undecodable sounds are reported by `preload` and ignored by `play`.
pub trait SoundBank {
    fn preload(&mut self, names: &[&str]) -> PreloadReport;

    /// Fire-and-forget playback. Unknown names are a logged no-op.
    fn play(&mut self, name: &str);
}

/// Plays the sound attached to an event, skipping the silent sentinel.
pub(crate) fn play_cue(bank: &mut dyn SoundBank, sound: &SoundId) {
    if let Some(name) = sound.name() {
        bank.play(name);
    }
}

/// Outcome of a preload pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    pub missing: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Decoded audio data, interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundClip {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl SoundClip {
    pub fn duration_seconds(&self) -> f32 {
        let frames = self.samples.len() / self.channels.max(1) as usize;
        frames as f32 / self.sample_rate.max(1) as f32
    }

    /// Decodes a WAV file into floating point samples.
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };
        Ok(Self {
            samples: samples.into(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}

/// A playback request the bank accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundCue {
    pub name: String,
    pub duration_seconds: f32,
}

/// Sound bank backed by `<root>/<name>.wav` files.
///
/// Accepted plays are queued as [`SoundCue`]s; the host drains them with
/// [`SampleBank::take_cues`] and hands them to whatever output it has.
#[derive(Debug, Default)]
pub struct SampleBank {
    root: Option<PathBuf>,
    clips: HashMap<String, SoundClip>,
    cues: Vec<SoundCue>,
}

impl SampleBank {
    /// A bank without a backing directory; clips can still be inserted.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, clip: SoundClip) {
        self.clips.insert(name.into(), clip);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn cues(&self) -> &[SoundCue] {
        &self.cues
    }

    pub fn take_cues(&mut self) -> Vec<SoundCue> {
        std::mem::take(&mut self.cues)
    }
}

impl SoundBank for SampleBank {
    fn preload(&mut self, names: &[&str]) -> PreloadReport {
        let mut report = PreloadReport::default();
        for &name in names {
            if SoundId::is_silent_token(name) || self.clips.contains_key(name) {
                continue;
            }
            let Some(root) = &self.root else {
                report.missing.push(name.to_string());
                continue;
            };

            let path = root.join(format!("{name}.wav"));
            if !path.exists() {
                tracing::warn!(sound = name, path = %path.display(), "sound file not found");
                report.missing.push(name.to_string());
                continue;
            }

            match SoundClip::from_wav(&path) {
                Ok(clip) => {
                    tracing::debug!(sound = name, seconds = clip.duration_seconds(), "sound loaded");
                    self.clips.insert(name.to_string(), clip);
                    report.loaded.push(name.to_string());
                }
                Err(err) => {
                    tracing::warn!(sound = name, %err, "failed to decode sound");
                    report.failed.push((name.to_string(), err.to_string()));
                }
            }
        }
        report
    }

    fn play(&mut self, name: &str) {
        match self.clips.get(name) {
            Some(clip) => {
                tracing::debug!(sound = name, "sound cue");
                self.cues.push(SoundCue {
                    name: name.to_string(),
                    duration_seconds: clip.duration_seconds(),
                });
            }
            None => tracing::warn!(sound = name, "sound not loaded, skipping cue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tone(path: &Path, frames: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let value = if i % 2 == 0 { i16::MAX } else { i16::MIN };
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn preloads_available_sounds_and_reports_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write_tone(&dir.path().join("ドラゴン.wav"), 4_000);
        std::fs::write(dir.path().join("broken.wav"), b"not a wav").unwrap();

        let mut bank = SampleBank::with_root(dir.path());
        let report = bank.preload(&["ドラゴン", "キラッ1", "broken", "無音"]);

        assert_eq!(report.loaded, vec!["ドラゴン".to_string()]);
        assert_eq!(report.missing, vec!["キラッ1".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_complete());
        assert!(bank.contains("ドラゴン"));
        assert!(!bank.contains("無音"));
    }

    #[test]
    fn decodes_integer_samples_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path, 8_000);

        let clip = SoundClip::from_wav(&path).unwrap();
        assert_eq!(clip.sample_rate, 8_000);
        assert!((clip.duration_seconds() - 1.0).abs() < 1e-6);
        assert!(clip.samples.iter().all(|sample| (-1.0..=1.0).contains(sample)));
    }

    #[test]
    fn plays_known_sounds_and_skips_unknown() {
        let mut bank = SampleBank::new();
        bank.insert(
            "ジャン！",
            SoundClip {
                samples: vec![0.0; 4_800].into(),
                sample_rate: 48_000,
                channels: 2,
            },
        );

        bank.play("ジャン！");
        bank.play("unknown");
        play_cue(&mut bank, &SoundId::Silent);

        let cues = bank.take_cues();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].name, "ジャン！");
        assert!((cues[0].duration_seconds - 0.05).abs() < 1e-6);
        assert!(bank.cues().is_empty());
    }

    #[test]
    fn bank_without_root_reports_everything_missing() {
        let mut bank = SampleBank::new();
        let report = bank.preload(&["和太鼓でドン"]);
        assert_eq!(report.missing, vec!["和太鼓でドン".to_string()]);
    }
}
