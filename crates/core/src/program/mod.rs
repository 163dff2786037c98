//! Firing events and the programs that order them.
//!
//! Programs arrive as the JSON array written by the authoring page
//! (`{timing, color, sound, position: {x, y}, type, emoji}`) or wrapped in a
//! persisted [`ProgramDocument`]. Decoding is forgiving: only structurally
//! broken JSON is rejected, individual fields are normalised with a warning.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, ShowError};

/// Glyph used when a glyph event carries no text.
pub const DEFAULT_GLYPH: &str = "🌸";

/// Sound token that means "play nothing".
pub const SILENT_SOUND: &str = "無音";

/// Sounds offered by the authoring page, in menu order.
pub const DEFAULT_SOUNDS: [&str; 9] = [
    "和太鼓でドン",
    "打ち上げ花火",
    "チーン2",
    "ジャン！",
    "シャキーン2",
    "キラッ1",
    "きらーん2",
    "ドラゴン",
    SILENT_SOUND,
];

/// Color tokens offered by the authoring page.
pub const DEFAULT_COLORS: [&str; 7] = ["red", "blue", "yellow", "green", "white", "purple", "pink"];

const DEFAULT_POSITION: Position = Position { x: 0.5, y: 0.8 };
const AUTHORING_SPACING_MS: u64 = 1000;

/// Explosion effect requested by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FireKind {
    /// Omnidirectional burst (`maru`).
    #[default]
    Radial,
    /// Continuous upward spray (`hunshutsu`).
    Fountain,
    /// Text or emoji shaped shell (`moji/emoji`).
    Glyph,
}

impl FireKind {
    pub fn token(self) -> &'static str {
        match self {
            FireKind::Radial => "maru",
            FireKind::Fountain => "hunshutsu",
            FireKind::Glyph => "moji/emoji",
        }
    }

    /// Resolves a wire token. Unknown tokens fall back to [`FireKind::Radial`].
    pub fn from_token(token: &str) -> Self {
        match token {
            "maru" => FireKind::Radial,
            "hunshutsu" => FireKind::Fountain,
            "moji/emoji" | "moji" | "emoji" => FireKind::Glyph,
            other => {
                tracing::warn!(kind = other, "unknown firework type, using radial burst");
                FireKind::Radial
            }
        }
    }
}

impl From<String> for FireKind {
    fn from(value: String) -> Self {
        Self::from_token(&value)
    }
}

impl From<FireKind> for String {
    fn from(value: FireKind) -> Self {
        value.token().to_string()
    }
}

impl fmt::Display for FireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Sound attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SoundId {
    #[default]
    Silent,
    Named(String),
}

impl SoundId {
    pub fn named(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    /// Name to look up in a sound bank, `None` when silent.
    pub fn name(&self) -> Option<&str> {
        match self {
            SoundId::Silent => None,
            SoundId::Named(name) => Some(name),
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, SoundId::Silent)
    }

    pub fn is_silent_token(token: &str) -> bool {
        matches!(token.trim(), "" | SILENT_SOUND | "なし")
    }
}

impl From<String> for SoundId {
    fn from(value: String) -> Self {
        if Self::is_silent_token(&value) {
            SoundId::Silent
        } else {
            SoundId::Named(value)
        }
    }
}

impl From<SoundId> for String {
    fn from(value: SoundId) -> Self {
        match value {
            SoundId::Silent => SILENT_SOUND.to_string(),
            SoundId::Named(name) => name,
        }
    }
}

/// Normalised event position in `[0, 1] × [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }.clamped()
    }

    /// Clamps both coordinates into the unit square. Non-finite values take
    /// the default authoring position.
    pub fn clamped(self) -> Self {
        let fix = |value: f32, fallback: f32| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };
        Self {
            x: fix(self.x, DEFAULT_POSITION.x),
            y: fix(self.y, DEFAULT_POSITION.y),
        }
    }

    /// Scales the normalised position to a surface of the given size. The
    /// fields are public, so the position is clamped again here.
    pub fn to_pixels(self, width: u32, height: u32) -> (f32, f32) {
        let Self { x, y } = self.clamped();
        (x * width as f32, y * height as f32)
    }
}

impl Default for Position {
    fn default() -> Self {
        DEFAULT_POSITION
    }
}

/// One scheduled shot.
#[derive(Debug, Clone, PartialEq)]
pub struct FiringEvent {
    pub id: u32,
    pub timing_ms: u64,
    pub position: Position,
    pub color: String,
    pub sound: SoundId,
    pub kind: FireKind,
    pub glyph: String,
    pub(crate) has_fired: bool,
}

impl FiringEvent {
    pub fn new(id: u32, timing_ms: u64, kind: FireKind) -> Self {
        Self {
            id,
            timing_ms,
            position: DEFAULT_POSITION,
            color: "white".to_string(),
            sound: SoundId::Silent,
            kind,
            glyph: String::new(),
            has_fired: false,
        }
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = SoundId::named(sound);
        self
    }

    pub fn with_glyph(mut self, glyph: impl Into<String>) -> Self {
        self.glyph = glyph.into();
        self
    }

    /// Whether the event has been consumed in the current playback session.
    pub fn has_fired(&self) -> bool {
        self.has_fired
    }

    /// Glyph text to rasterize, substituting the default when empty.
    pub fn glyph_or_default(&self) -> &str {
        if self.glyph.trim().is_empty() {
            DEFAULT_GLYPH
        } else {
            &self.glyph
        }
    }

    fn from_record(id: u32, record: EventRecord) -> Self {
        let timing = record.timing.unwrap_or(0.0);
        let timing_ms = if timing.is_finite() && timing > 0.0 {
            timing.round() as u64
        } else {
            if timing != 0.0 {
                tracing::warn!(id, timing, "invalid timing, firing at start");
            }
            0
        };

        // Authoring inputs that failed to parse are persisted as null.
        let requested = Position {
            x: record.position.x.map_or(f32::NAN, |x| x as f32),
            y: record.position.y.map_or(f32::NAN, |y| y as f32),
        };
        let position = requested.clamped();
        if position != requested {
            tracing::warn!(id, ?requested, ?position, "event position clamped");
        }

        Self {
            id,
            timing_ms,
            position,
            color: record.color,
            sound: record.sound,
            kind: record.kind,
            glyph: record.emoji,
            has_fired: false,
        }
    }

    fn to_record(&self) -> EventRecord {
        EventRecord {
            timing: Some(self.timing_ms as f64),
            color: self.color.clone(),
            sound: self.sound.clone(),
            position: RecordPosition {
                x: Some(self.position.x as f64),
                y: Some(self.position.y as f64),
            },
            kind: self.kind,
            emoji: if self.kind == FireKind::Glyph {
                self.glyph_or_default().to_string()
            } else {
                String::new()
            },
        }
    }
}

/// Wire shape of a single event inside `program_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventRecord {
    #[serde(default)]
    timing: Option<f64>,
    #[serde(default = "default_color")]
    color: String,
    #[serde(default)]
    sound: SoundId,
    #[serde(default)]
    position: RecordPosition,
    #[serde(rename = "type", default)]
    kind: FireKind,
    #[serde(default)]
    emoji: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordPosition {
    #[serde(default = "default_x")]
    x: Option<f64>,
    #[serde(default = "default_y")]
    y: Option<f64>,
}

impl Default for RecordPosition {
    fn default() -> Self {
        Self {
            x: default_x(),
            y: default_y(),
        }
    }
}

fn default_color() -> String {
    "white".to_string()
}

fn default_x() -> Option<f64> {
    Some(DEFAULT_POSITION.x as f64)
}

fn default_y() -> Option<f64> {
    Some(DEFAULT_POSITION.y as f64)
}

/// Ordered collection of firing events. Order is not required to follow timing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    events: Vec<FiringEvent>,
    next_id: u32,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// The program the authoring page opens with.
    pub fn default_show() -> Self {
        let mut program = Self::new();
        let id = program.allocate_id();
        program.events.push(
            FiringEvent::new(id, AUTHORING_SPACING_MS, FireKind::Radial).with_sound("打ち上げ花火"),
        );
        program
    }

    pub fn from_events(events: Vec<FiringEvent>) -> Self {
        let next_id = events
            .iter()
            .map(|event| event.id.saturating_add(1))
            .max()
            .unwrap_or(0);
        Self { events, next_id }
    }

    /// Decodes a bare `program_data` array.
    pub fn from_json(raw: &str) -> Result<Self> {
        let records: Vec<EventRecord> = serde_json::from_str(raw)?;
        Ok(Self::from_records(records))
    }

    /// Decodes either a bare event array or a persisted [`ProgramDocument`].
    pub fn load(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        match value {
            serde_json::Value::Array(_) => {
                let records: Vec<EventRecord> = serde_json::from_value(value)?;
                Ok(Self::from_records(records))
            }
            serde_json::Value::Object(_) => {
                let document: ProgramDocument = serde_json::from_value(value)?;
                document.program()
            }
            _ => Err(ShowError::InvalidInput(
                "program must be an event array or a program document",
            )),
        }
    }

    /// Encodes the events in the save format. Ids and fired flags are not
    /// persisted.
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<EventRecord> = self.events.iter().map(FiringEvent::to_record).collect();
        Ok(serde_json::to_string(&records)?)
    }

    fn from_records(records: Vec<EventRecord>) -> Self {
        let events = records
            .into_iter()
            .zip(0u32..)
            .map(|(record, id)| FiringEvent::from_record(id, record))
            .collect();
        Self::from_events(events)
    }

    /// Hands out `next_id`, or the lowest free id once that one is taken
    /// (after an event with `u32::MAX` has been seen).
    fn allocate_id(&mut self) -> u32 {
        let mut id = self.next_id;
        if self.get(id).is_some() {
            id = (0..=u32::MAX)
                .find(|candidate| self.get(*candidate).is_none())
                .unwrap_or(id);
        }
        self.next_id = id.saturating_add(1);
        id
    }

    /// Appends an event with a fresh id and returns that id.
    pub fn push(&mut self, mut event: FiringEvent) -> u32 {
        event.id = self.allocate_id();
        event.has_fired = false;
        let id = event.id;
        self.events.push(event);
        id
    }

    /// Appends the authoring page's default shot one second after the last one.
    pub fn push_default(&mut self) -> u32 {
        let timing_ms = self
            .events
            .last()
            .map(|event| event.timing_ms + AUTHORING_SPACING_MS)
            .unwrap_or(AUTHORING_SPACING_MS);
        self.push(FiringEvent::new(0, timing_ms, FireKind::Radial).with_sound("和太鼓でドン"))
    }

    pub fn remove(&mut self, id: u32) -> Option<FiringEvent> {
        let index = self.events.iter().position(|event| event.id == id)?;
        Some(self.events.remove(index))
    }

    pub fn get(&self, id: u32) -> Option<&FiringEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut FiringEvent> {
        self.events.iter_mut().find(|event| event.id == id)
    }

    pub fn events(&self) -> &[FiringEvent] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut [FiringEvent] {
        &mut self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &FiringEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timing of the latest event, zero for an empty program.
    pub fn last_timing_ms(&self) -> u64 {
        self.events
            .iter()
            .map(|event| event.timing_ms)
            .max()
            .unwrap_or(0)
    }

    /// Distinct sound names referenced by the program.
    pub fn sound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .events
            .iter()
            .filter_map(|event| event.sound.name().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Program as stored by the persistence backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// JSON string holding the event array.
    pub program_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ProgramDocument {
    pub fn new(title: impl Into<String>, program: &Program) -> Result<Self> {
        Ok(Self {
            id: None,
            title: title.into(),
            description: String::new(),
            program_data: program.to_json()?,
            user: None,
            created_at: None,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn program(&self) -> Result<Program> {
        if self.program_data.trim().is_empty() {
            return Err(ShowError::InvalidInput("program document has no program data"));
        }
        Program::from_json(&self.program_data)
    }
}
