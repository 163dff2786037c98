use crate::program::{FireKind, Program, SoundId};

/// Whether a program is currently being played.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaybackSession {
    #[default]
    Idle,
    /// Playing since host time `origin_ms`.
    Running { origin_ms: f64 },
}

impl PlaybackSession {
    pub fn is_running(&self) -> bool {
        matches!(self, PlaybackSession::Running { .. })
    }

    /// Milliseconds since the session started, `None` while idle.
    pub fn elapsed_ms(&self, now_ms: f64) -> Option<f64> {
        match self {
            PlaybackSession::Idle => None,
            PlaybackSession::Running { origin_ms } => Some((now_ms - origin_ms).max(0.0)),
        }
    }
}

/// Session-relative frame clock. Never runs backwards.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    elapsed_ms: f64,
    frames: u64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.elapsed_ms = 0.0;
        self.frames = 0;
    }

    /// Moves the clock to `elapsed_ms` and returns the milliseconds advanced.
    pub fn advance_to(&mut self, elapsed_ms: f64) -> f64 {
        let target = elapsed_ms.max(self.elapsed_ms);
        let delta = if self.frames == 0 {
            0.0
        } else {
            target - self.elapsed_ms
        };
        self.elapsed_ms = target;
        self.frames += 1;
        delta
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Timing of one frame of a running session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub elapsed_ms: f64,
    pub delta_ms: f64,
}

/// Everything needed to realize a due event, with the position already scaled
/// to the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct FireCommand {
    pub event_id: u32,
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub kind: FireKind,
    pub glyph: String,
    pub sound: SoundId,
}

/// Owns the program and the playback session, and decides which events are
/// due on each frame.
#[derive(Debug, Default)]
pub struct Scheduler {
    program: Program,
    session: PlaybackSession,
    clock: PlaybackClock,
}

impl Scheduler {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            ..Self::default()
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Replaces the program. A running session keeps running against the new
    /// events, all of which are unfired.
    pub fn set_program(&mut self, mut program: Program) {
        reset_fired(&mut program);
        self.program = program;
    }

    pub fn session(&self) -> PlaybackSession {
        self.session
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Starts a fresh session at host time `now_ms`, rewinding every event.
    pub fn start(&mut self, now_ms: f64) {
        self.session = PlaybackSession::Running { origin_ms: now_ms };
        self.clock.reset();
        reset_fired(&mut self.program);
    }

    /// Halts evaluation. Fired flags are left untouched until the next start.
    pub fn stop(&mut self) {
        self.session = PlaybackSession::Idle;
    }

    /// Advances the clock to host time `now_ms`. Returns `None` while idle.
    pub fn tick(&mut self, now_ms: f64) -> Option<FrameTime> {
        let elapsed = self.session.elapsed_ms(now_ms)?;
        let delta_ms = self.clock.advance_to(elapsed);
        Some(FrameTime {
            elapsed_ms: self.clock.elapsed_ms(),
            delta_ms,
        })
    }

    /// Consumes every unfired event with `timing_ms <= elapsed_ms`, in program
    /// order.
    pub fn take_due(&mut self, elapsed_ms: f64, (width, height): (u32, u32)) -> Vec<FireCommand> {
        if !self.session.is_running() {
            return Vec::new();
        }

        let mut due = Vec::new();
        for event in self.program.events_mut() {
            if event.has_fired || event.timing_ms as f64 > elapsed_ms {
                continue;
            }
            event.has_fired = true;

            let (x, y) = event.position.to_pixels(width, height);
            tracing::debug!(id = event.id, timing_ms = event.timing_ms, kind = %event.kind, "event fired");
            due.push(FireCommand {
                event_id: event.id,
                x,
                y,
                color: event.color.clone(),
                kind: event.kind,
                glyph: event.glyph_or_default().to_string(),
                sound: event.sound.clone(),
            });
        }
        due
    }
}

fn reset_fired(program: &mut Program) {
    for event in program.events_mut() {
        event.has_fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::FiringEvent;

    fn program() -> Program {
        let mut program = Program::new();
        program.push(FiringEvent::new(0, 1000, FireKind::Radial).with_position(0.5, 0.8));
        program.push(FiringEvent::new(0, 250, FireKind::Fountain).with_position(0.1, 0.9));
        program.push(FiringEvent::new(0, 1000, FireKind::Glyph).with_glyph("A"));
        program
    }

    #[test]
    fn fires_each_event_once_when_due() {
        let mut scheduler = Scheduler::new(program());
        scheduler.start(10_000.0);

        assert!(scheduler.take_due(249.0, (100, 100)).is_empty());

        let early = scheduler.take_due(250.0, (100, 100));
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].kind, FireKind::Fountain);
        assert_eq!((early[0].x, early[0].y), (10.0, 90.0));

        assert!(scheduler.take_due(999.9, (100, 100)).is_empty());

        let on_time = scheduler.take_due(1000.0, (200, 100));
        let ids: Vec<u32> = on_time.iter().map(|command| command.event_id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!((on_time[0].x, on_time[0].y), (100.0, 80.0));
        assert_eq!(on_time[1].glyph, "A");

        assert!(scheduler.take_due(50_000.0, (100, 100)).is_empty());
        assert!(scheduler.program().iter().all(FiringEvent::has_fired));
    }

    #[test]
    fn restart_rewinds_fired_flags() {
        let mut scheduler = Scheduler::new(program());
        scheduler.start(0.0);
        assert_eq!(scheduler.take_due(5000.0, (10, 10)).len(), 3);

        scheduler.stop();
        assert!(scheduler.program().iter().all(FiringEvent::has_fired));
        assert!(scheduler.take_due(6000.0, (10, 10)).is_empty());
        assert!(scheduler.tick(6000.0).is_none());

        scheduler.start(20_000.0);
        assert!(scheduler.program().iter().all(|event| !event.has_fired()));
        assert_eq!(scheduler.take_due(5000.0, (10, 10)).len(), 3);
    }

    #[test]
    fn tick_measures_elapsed_from_session_origin() {
        let mut scheduler = Scheduler::new(program());
        scheduler.start(1_000.0);

        let first = scheduler.tick(1_000.0).unwrap();
        assert_eq!(first, FrameTime { elapsed_ms: 0.0, delta_ms: 0.0 });

        let second = scheduler.tick(1_020.0).unwrap();
        assert_eq!(second, FrameTime { elapsed_ms: 20.0, delta_ms: 20.0 });

        let backwards = scheduler.tick(1_010.0).unwrap();
        assert_eq!(backwards, FrameTime { elapsed_ms: 20.0, delta_ms: 0.0 });
        assert_eq!(scheduler.clock().frames(), 3);
    }

    #[test]
    fn clamps_positions_edited_after_construction() {
        let mut program = Program::new();
        let id = program.push(FiringEvent::new(0, 0, FireKind::Glyph));
        let event = program.get_mut(id).unwrap();
        event.position.x = 3.0;
        event.position.y = f32::NAN;

        let mut scheduler = Scheduler::new(program);
        scheduler.start(0.0);
        let due = scheduler.take_due(0.0, (100, 200));
        assert_eq!((due[0].x, due[0].y), (100.0, 160.0));
    }

    #[test]
    fn tolerates_duplicate_ids_and_unsorted_timings() {
        let events = vec![
            FiringEvent::new(4, 900, FireKind::Radial),
            FiringEvent::new(4, 100, FireKind::Radial),
        ];
        let mut scheduler = Scheduler::new(Program::from_events(events));
        scheduler.start(0.0);

        assert_eq!(scheduler.take_due(100.0, (10, 10)).len(), 1);
        assert_eq!(scheduler.take_due(900.0, (10, 10)).len(), 1);
    }
}
