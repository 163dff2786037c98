//! Live effects created when an event fires.
//!
//! Radial bursts and glyph shells are [`Explosion`]s with a bounded lifetime.
//! Fountains are long-lived emitters that feed a particle pool shared by all
//! fountains. The render loop only talks to them through [`Effect`].

use rand::{rngs::StdRng, Rng};

use crate::{
    audio::{play_cue, SoundBank},
    config::ShowConfig,
    glyph::{GlyphRasterizer, RasterRequest},
    particles::{uniform, FountainParticle, GlyphParticle, ParticlePool, RadialParticle},
    program::{FireKind, SoundId},
    render::{Rgba, Surface},
    timeline::FireCommand,
};

/// Shared state an effect may touch while it updates.
pub struct FrameContext<'a> {
    /// Reference frames since the previous update.
    pub dt: f32,
    /// Session time of the current frame.
    pub elapsed_ms: f64,
    /// Size of the surface this frame is drawn on.
    pub canvas: (u32, u32),
    pub config: &'a ShowConfig,
    pub rng: &'a mut StdRng,
    pub sounds: &'a mut dyn SoundBank,
    pub rasterizer: &'a dyn GlyphRasterizer,
    pub fountain_particles: &'a mut ParticlePool<FountainParticle>,
}

/// Uniform capability of every live effect.
pub trait Effect {
    fn update(&mut self, frame: &mut FrameContext<'_>);

    fn draw(&self, surface: &mut dyn Surface);

    fn is_alive(&self) -> bool;
}

/// What a fired event turns into.
#[derive(Debug, Clone)]
pub enum Ignition {
    Explosion(Explosion),
    Fountain(Fountain),
}

/// Realizes a fire command. Radial bursts and fountains are heard at
/// ignition; glyph shells stay silent until they burst.
pub fn ignite(command: &FireCommand, frame: &mut FrameContext<'_>) -> Ignition {
    let color = Rgba::parse_or_white(&command.color);
    match command.kind {
        FireKind::Radial => {
            let burst = RadialBurst::new(frame.rng, (command.x, command.y), color, frame.config);
            play_cue(frame.sounds, &command.sound);
            Ignition::Explosion(Explosion::Radial(burst))
        }
        FireKind::Fountain => {
            let deadline_ms = frame.elapsed_ms + frame.config.fountain.duration_ms;
            play_cue(frame.sounds, &command.sound);
            Ignition::Fountain(Fountain::new((command.x, command.y), color, deadline_ms))
        }
        FireKind::Glyph => {
            let shell = GlyphShell::new(
                frame.rng,
                (command.x, command.y),
                frame.canvas.1 as f32,
                &command.glyph,
                color,
                command.sound.clone(),
                frame.config,
            );
            Ignition::Explosion(Explosion::Glyph(shell))
        }
    }
}

/// Bounded-lifetime explosion.
#[derive(Debug, Clone)]
pub enum Explosion {
    Radial(RadialBurst),
    Glyph(GlyphShell),
}

impl Explosion {
    pub fn kind(&self) -> FireKind {
        match self {
            Explosion::Radial(_) => FireKind::Radial,
            Explosion::Glyph(_) => FireKind::Glyph,
        }
    }

    pub fn particle_count(&self) -> usize {
        match self {
            Explosion::Radial(burst) => burst.particles.len(),
            Explosion::Glyph(shell) => shell.particles.len(),
        }
    }
}

impl Effect for Explosion {
    fn update(&mut self, frame: &mut FrameContext<'_>) {
        match self {
            Explosion::Radial(burst) => burst.update(frame),
            Explosion::Glyph(shell) => shell.update(frame),
        }
    }

    fn draw(&self, surface: &mut dyn Surface) {
        match self {
            Explosion::Radial(burst) => burst.draw(surface),
            Explosion::Glyph(shell) => shell.draw(surface),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Explosion::Radial(burst) => burst.is_alive(),
            Explosion::Glyph(shell) => shell.is_alive(),
        }
    }
}

/// Omnidirectional burst seeded all at once at the firing position.
#[derive(Debug, Clone)]
pub struct RadialBurst {
    particles: ParticlePool<RadialParticle>,
}

impl RadialBurst {
    pub fn new(rng: &mut StdRng, (x, y): (f32, f32), color: Rgba, config: &ShowConfig) -> Self {
        let radial = &config.radial;
        let count = rng.random_range(radial.min_particles..=radial.max_particles);
        let mut particles = ParticlePool::new();
        particles.extend((0..count).map(|_| RadialParticle::spawn(&mut *rng, x, y, color, radial)));
        Self { particles }
    }

    pub fn particles(&self) -> &ParticlePool<RadialParticle> {
        &self.particles
    }
}

impl Effect for RadialBurst {
    fn update(&mut self, frame: &mut FrameContext<'_>) {
        self.particles.update(frame.dt);
    }

    fn draw(&self, surface: &mut dyn Surface) {
        self.particles.draw(surface);
    }

    fn is_alive(&self) -> bool {
        self.particles.any_alive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphPhase {
    /// Marker climbing from the bottom edge toward the target.
    Rising,
    /// Shell has burst; seeded particles are dispersing.
    Dispersing,
}

/// Text or emoji shaped shell: rise, burst, disperse.
#[derive(Debug, Clone)]
pub struct GlyphShell {
    marker: (f32, f32),
    marker_radius: f32,
    target: (f32, f32),
    size: f32,
    text: String,
    color: Rgba,
    sound: SoundId,
    phase: GlyphPhase,
    particles: ParticlePool<GlyphParticle>,
}

impl GlyphShell {
    pub fn new(
        rng: &mut StdRng,
        target: (f32, f32),
        launch_y: f32,
        text: &str,
        color: Rgba,
        sound: SoundId,
        config: &ShowConfig,
    ) -> Self {
        Self {
            marker: (target.0, launch_y),
            marker_radius: config.glyph.marker_radius,
            target,
            size: uniform(rng, config.glyph.min_size, config.glyph.max_size),
            text: text.to_string(),
            color,
            sound,
            phase: GlyphPhase::Rising,
            particles: ParticlePool::new(),
        }
    }

    pub fn phase(&self) -> GlyphPhase {
        self.phase
    }

    pub fn marker(&self) -> (f32, f32) {
        self.marker
    }

    pub fn particles(&self) -> &ParticlePool<GlyphParticle> {
        &self.particles
    }

    /// Rasterizes the text and seeds one particle per sampled cell above the
    /// alpha threshold.
    fn burst(&mut self, frame: &mut FrameContext<'_>) {
        let config = &frame.config.glyph;
        let request = RasterRequest {
            raster_size: config.raster_size,
            font_px: config.font_px,
            outline: config.outline.then_some(config.outline_width),
        };
        let raster = frame.rasterizer.rasterize(&self.text, &request);
        let (center_x, center_y) = raster.center();
        let spread = self.size / config.font_px;

        for cell in raster.sample(config.sample_step, config.alpha_threshold) {
            let x = self.target.0 + (cell.x as f32 - center_x) * spread;
            let y = self.target.1 + (cell.y as f32 - center_y) * spread;
            self.particles
                .push(GlyphParticle::seed(frame.rng, (x, y), self.target, self.color, config));
        }

        self.phase = GlyphPhase::Dispersing;
        tracing::debug!(text = %self.text, particles = self.particles.len(), "glyph shell burst");
        play_cue(frame.sounds, &self.sound);
    }
}

impl Effect for GlyphShell {
    fn update(&mut self, frame: &mut FrameContext<'_>) {
        match self.phase {
            GlyphPhase::Rising => {
                self.marker.1 -= frame.config.glyph.rise_step * frame.dt;
                if self.marker.1 <= self.target.1 {
                    self.burst(frame);
                }
            }
            GlyphPhase::Dispersing => self.particles.update(frame.dt),
        }
    }

    fn draw(&self, surface: &mut dyn Surface) {
        match self.phase {
            GlyphPhase::Rising => {
                surface.fill_circle(self.marker.0, self.marker.1, self.marker_radius, Rgba::WHITE, 1.0);
            }
            GlyphPhase::Dispersing => self.particles.draw(surface),
        }
    }

    fn is_alive(&self) -> bool {
        self.phase == GlyphPhase::Rising || self.particles.any_alive()
    }
}

/// Continuous emitter. Spawns into the shared fountain particle pool until
/// its deadline passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Fountain {
    x: f32,
    y: f32,
    color: Rgba,
    active: bool,
    deadline_ms: f64,
}

impl Fountain {
    pub fn new((x, y): (f32, f32), color: Rgba, deadline_ms: f64) -> Self {
        Self {
            x,
            y,
            color,
            active: true,
            deadline_ms,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn deadline_ms(&self) -> f64 {
        self.deadline_ms
    }
}

impl Effect for Fountain {
    fn update(&mut self, frame: &mut FrameContext<'_>) {
        if !self.active {
            return;
        }
        if frame.elapsed_ms >= self.deadline_ms {
            self.active = false;
            tracing::debug!(x = self.x, y = self.y, "fountain spent");
            return;
        }

        let config = &frame.config.fountain;
        for _ in 0..config.batch_size {
            let particle = FountainParticle::spawn(frame.rng, self.x, self.y, self.color, config);
            frame.fountain_particles.push(particle);
        }
    }

    /// The emitter itself is invisible; only its particles are drawn.
    fn draw(&self, _surface: &mut dyn Surface) {}

    fn is_alive(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{audio::PreloadReport, glyph::GlyphRaster};

    #[derive(Default)]
    struct Played(Vec<String>);

    impl SoundBank for Played {
        fn preload(&mut self, _names: &[&str]) -> PreloadReport {
            PreloadReport::default()
        }

        fn play(&mut self, name: &str) {
            self.0.push(name.to_string());
        }
    }

    /// Lights two sample cells near the centre.
    struct TwoDots;

    impl GlyphRasterizer for TwoDots {
        fn rasterize(&self, _text: &str, request: &RasterRequest) -> GlyphRaster {
            let size = request.raster_size;
            let mut alpha = vec![0; (size * size) as usize];
            alpha[(96 * size + 96) as usize] = 255;
            alpha[(96 * size + 104) as usize] = 200;
            GlyphRaster::from_alpha(size, size, alpha).unwrap()
        }
    }

    struct Harness {
        config: ShowConfig,
        rng: StdRng,
        sounds: Played,
        pool: ParticlePool<FountainParticle>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                config: ShowConfig::default(),
                rng: StdRng::seed_from_u64(21),
                sounds: Played::default(),
                pool: ParticlePool::new(),
            }
        }

        fn frame(&mut self, elapsed_ms: f64, dt: f32) -> FrameContext<'_> {
            FrameContext {
                dt,
                elapsed_ms,
                canvas: (400, 400),
                config: &self.config,
                rng: &mut self.rng,
                sounds: &mut self.sounds,
                rasterizer: &TwoDots,
                fountain_particles: &mut self.pool,
            }
        }
    }

    fn command(kind: FireKind, sound: &str) -> FireCommand {
        FireCommand {
            event_id: 0,
            x: 200.0,
            y: 100.0,
            color: "green".to_string(),
            kind,
            glyph: "A".to_string(),
            sound: SoundId::named(sound),
        }
    }

    #[test]
    fn radial_ignition_seeds_particles_and_plays_once() {
        let mut harness = Harness::new();
        let ignition = ignite(&command(FireKind::Radial, "ドン"), &mut harness.frame(0.0, 0.0));

        let Ignition::Explosion(explosion) = ignition else {
            panic!("radial should explode");
        };
        assert_eq!(explosion.kind(), FireKind::Radial);
        assert!((50..=100).contains(&explosion.particle_count()));
        assert_eq!(harness.sounds.0, vec!["ドン".to_string()]);
    }

    #[test]
    fn fountain_stops_emitting_at_its_deadline() {
        let mut harness = Harness::new();
        let ignition = ignite(&command(FireKind::Fountain, "無音"), &mut harness.frame(1000.0, 1.0));
        let Ignition::Fountain(mut fountain) = ignition else {
            panic!("expected a fountain");
        };
        assert_eq!(fountain.deadline_ms(), 6000.0);
        assert!(harness.sounds.0.is_empty());

        fountain.update(&mut harness.frame(5999.0, 1.0));
        assert_eq!(harness.pool.len(), 5);
        assert!(fountain.is_alive());

        fountain.update(&mut harness.frame(6000.0, 1.0));
        assert_eq!(harness.pool.len(), 5);
        assert!(!fountain.is_alive());
    }

    #[test]
    fn glyph_shell_bursts_once_at_its_target() {
        let mut harness = Harness::new();
        let ignition = ignite(&command(FireKind::Glyph, "パーン"), &mut harness.frame(0.0, 0.0));
        let Ignition::Explosion(mut shell) = ignition else {
            panic!("expected a glyph shell");
        };
        assert!(harness.sounds.0.is_empty());

        // 300 px to climb at 5 px per reference frame.
        for _ in 0..59 {
            shell.update(&mut harness.frame(0.0, 1.0));
        }
        let Explosion::Glyph(rising) = &shell else {
            panic!("expected a glyph shell");
        };
        assert_eq!(rising.phase(), GlyphPhase::Rising);
        assert_eq!(shell.particle_count(), 0);

        shell.update(&mut harness.frame(0.0, 1.0));
        assert_eq!(shell.particle_count(), 2);
        assert_eq!(harness.sounds.0, vec!["パーン".to_string()]);

        shell.update(&mut harness.frame(0.0, 1.0));
        assert_eq!(harness.sounds.0.len(), 1);
        assert!(shell.is_alive());
    }
}
