//! The per-frame driver that ties the scheduler, the effects and the sound
//! bank together.

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    audio::{PreloadReport, SoundBank},
    config::ShowConfig,
    explosion::{ignite, Effect, Explosion, Fountain, FrameContext, Ignition},
    glyph::{BitmapFont, GlyphRasterizer},
    particles::{FountainParticle, ParticlePool},
    program::Program,
    render::Surface,
    timeline::{PlaybackSession, Scheduler},
    Result,
};

/// Playback engine for one program.
///
/// The host calls [`ShowEngine::frame`] from its animation callback with a
/// monotonic timestamp in milliseconds and keeps calling it for as long as it
/// returns `true`. All state is owned here; nothing is shared across threads.
pub struct ShowEngine<S> {
    config: ShowConfig,
    scheduler: Scheduler,
    sounds: S,
    rasterizer: Box<dyn GlyphRasterizer>,
    rng: StdRng,
    explosions: Vec<Explosion>,
    fountains: Vec<Fountain>,
    fountain_particles: ParticlePool<FountainParticle>,
}

impl<S: SoundBank> ShowEngine<S> {
    pub fn new(config: ShowConfig, program: Program, sounds: S) -> Result<Self> {
        Self::with_rng(config, program, sounds, StdRng::from_os_rng())
    }

    /// Engine whose randomized effect parameters are reproducible.
    pub fn with_seed(config: ShowConfig, program: Program, sounds: S, seed: u64) -> Result<Self> {
        Self::with_rng(config, program, sounds, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ShowConfig, program: Program, sounds: S, rng: StdRng) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scheduler: Scheduler::new(program),
            sounds,
            rasterizer: Box::new(BitmapFont),
            rng,
            explosions: Vec::new(),
            fountains: Vec::new(),
            fountain_particles: ParticlePool::new(),
        })
    }

    /// Replaces the built-in bitmap font used to shape glyph shells.
    pub fn with_rasterizer(mut self, rasterizer: impl GlyphRasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    /// Loads every sound the program references. Failures are reported, not
    /// raised; playback works regardless.
    pub fn preload_sounds(&mut self) -> PreloadReport {
        let names = self.scheduler.program().sound_names();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let report = self.sounds.preload(&names);
        if !report.is_complete() {
            tracing::warn!(
                missing = report.missing.len(),
                failed = report.failed.len(),
                "some sounds could not be loaded"
            );
        }
        report
    }

    pub fn config(&self) -> &ShowConfig {
        &self.config
    }

    pub fn program(&self) -> &Program {
        self.scheduler.program()
    }

    pub fn set_program(&mut self, program: Program) {
        self.scheduler.set_program(program);
    }

    pub fn sounds(&self) -> &S {
        &self.sounds
    }

    pub fn sounds_mut(&mut self) -> &mut S {
        &mut self.sounds
    }

    pub fn session(&self) -> PlaybackSession {
        self.scheduler.session()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.session().is_running()
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn fountains(&self) -> &[Fountain] {
        &self.fountains
    }

    pub fn fountain_particles(&self) -> &ParticlePool<FountainParticle> {
        &self.fountain_particles
    }

    /// Starts a new session at host time `now_ms`. Any previous session is
    /// discarded and every event becomes unfired.
    pub fn start(&mut self, now_ms: f64) {
        self.clear_effects();
        self.scheduler.start(now_ms);
        tracing::info!(events = self.scheduler.program().len(), "playback started");
    }

    /// Stops immediately: effects are dropped without winding down and the
    /// surface is cleared.
    pub fn stop(&mut self, surface: &mut dyn Surface) {
        self.scheduler.stop();
        self.clear_effects();
        surface.clear();
        tracing::info!("playback stopped");
    }

    fn clear_effects(&mut self) {
        self.explosions.clear();
        self.fountains.clear();
        self.fountain_particles.clear();
    }

    /// Runs one frame at host time `now_ms`. Returns whether the host should
    /// schedule another frame.
    pub fn frame(&mut self, now_ms: f64, surface: &mut dyn Surface) -> bool {
        let Some(time) = self.scheduler.tick(now_ms) else {
            return false;
        };
        let canvas = surface.size();
        let due = self.scheduler.take_due(time.elapsed_ms, canvas);

        // The opening frame has no measured delta; it still advances one
        // nominal frame so effects ignited on it move and fade right away.
        let delta_ms = if self.scheduler.clock().frames() == 1 {
            self.config.playback.frame_ms
        } else {
            time.delta_ms
        };

        let mut frame = FrameContext {
            dt: (delta_ms / self.config.playback.frame_ms) as f32,
            elapsed_ms: time.elapsed_ms,
            canvas,
            config: &self.config,
            rng: &mut self.rng,
            sounds: &mut self.sounds,
            rasterizer: self.rasterizer.as_ref(),
            fountain_particles: &mut self.fountain_particles,
        };

        for command in &due {
            match ignite(command, &mut frame) {
                Ignition::Explosion(explosion) => self.explosions.push(explosion),
                Ignition::Fountain(fountain) => self.fountains.push(fountain),
            }
        }

        for fountain in &mut self.fountains {
            fountain.update(&mut frame);
        }

        surface.clear();

        self.explosions.retain_mut(|explosion| {
            explosion.update(&mut frame);
            let alive = explosion.is_alive();
            if alive {
                explosion.draw(surface);
            }
            alive
        });
        self.fountains.retain(|fountain| {
            let alive = fountain.is_alive();
            if alive {
                fountain.draw(surface);
            }
            alive
        });
        frame.fountain_particles.step(frame.dt, surface);

        true
    }
}
