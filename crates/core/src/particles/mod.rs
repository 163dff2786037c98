//! The three particle kinds and the pool that owns them.
//!
//! Every rule is expressed per reference frame and scaled by `dt`, the number
//! of reference frames elapsed since the previous update.

use std::f32::consts::TAU;

use rand::Rng;

use crate::{
    config::{FountainConfig, GlyphConfig, RadialConfig},
    render::{Rgba, Surface},
};

/// Per-frame simulation and drawing capability shared by all particle kinds.
pub trait Particle {
    fn update(&mut self, dt: f32);

    fn draw(&self, surface: &mut dyn Surface);

    /// Opacity in `[0, 1]`; doubles as the liveness signal.
    fn alpha(&self) -> f32;

    fn is_alive(&self) -> bool {
        self.alpha() > 0.0
    }
}

/// Uniform sample from `[min, max)`, or `min` when the range is empty.
pub(crate) fn uniform(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

fn fade(alpha: f32, step: f32, dt: f32) -> f32 {
    (alpha - step * dt).max(0.0)
}

/// Spark of a radial burst. Travels in a straight line while slowing down.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialParticle {
    x: f32,
    y: f32,
    angle: f32,
    speed: f32,
    size: f32,
    alpha: f32,
    color: Rgba,
    drag: f32,
    fade: f32,
}

impl RadialParticle {
    pub fn spawn(rng: &mut impl Rng, x: f32, y: f32, color: Rgba, config: &RadialConfig) -> Self {
        Self {
            x,
            y,
            angle: rng.random_range(0.0..TAU),
            speed: uniform(rng, config.min_speed, config.max_speed),
            size: uniform(rng, config.min_size, config.max_size),
            alpha: 1.0,
            color,
            drag: config.drag,
            fade: config.fade,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}

impl Particle for RadialParticle {
    fn update(&mut self, dt: f32) {
        self.x += self.angle.cos() * self.speed * dt;
        self.y += self.angle.sin() * self.speed * dt;
        self.speed *= self.drag.powf(dt);
        self.alpha = fade(self.alpha, self.fade, dt);
    }

    fn draw(&self, surface: &mut dyn Surface) {
        surface.fill_circle(self.x, self.y, self.size, self.color, self.alpha);
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }
}

/// Spark thrown upward by a fountain and pulled back down by gravity.
#[derive(Debug, Clone, PartialEq)]
pub struct FountainParticle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    size: f32,
    alpha: f32,
    color: Rgba,
    gravity: f32,
    fade: f32,
}

impl FountainParticle {
    pub fn spawn(
        rng: &mut impl Rng,
        x: f32,
        y: f32,
        color: Rgba,
        config: &FountainConfig,
    ) -> Self {
        let half_jitter = config.jitter / 2.0;
        Self {
            x,
            y,
            vx: uniform(rng, -half_jitter, half_jitter),
            // Screen y grows downward.
            vy: -uniform(rng, config.min_lift, config.max_lift),
            size: uniform(rng, config.min_size, config.max_size),
            alpha: 1.0,
            color,
            gravity: config.gravity,
            fade: config.fade,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.vx, self.vy)
    }
}

impl Particle for FountainParticle {
    fn update(&mut self, dt: f32) {
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        self.vy += self.gravity * dt;
        self.alpha = fade(self.alpha, self.fade, dt);
    }

    fn draw(&self, surface: &mut dyn Surface) {
        surface.fill_circle(self.x, self.y, self.size, self.color, self.alpha);
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }
}

/// Particle of a glyph shell. Moves away from the shell centre, faster the
/// further out it was seeded.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphParticle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    size: f32,
    alpha: f32,
    color: Rgba,
    drag: f32,
    fade: f32,
}

impl GlyphParticle {
    pub fn seed(
        rng: &mut impl Rng,
        (x, y): (f32, f32),
        (center_x, center_y): (f32, f32),
        color: Rgba,
        config: &GlyphConfig,
    ) -> Self {
        let dx = x - center_x;
        let dy = y - center_y;
        let distance = dx.hypot(dy);
        let speed = dispersal_speed(distance, config);

        let (vx, vy) = if distance > 0.0 {
            (dx / distance * speed, dy / distance * speed)
        } else {
            let angle = rng.random_range(0.0..TAU);
            (angle.cos() * speed, angle.sin() * speed)
        };

        Self {
            x,
            y,
            vx,
            vy,
            size: uniform(rng, config.min_particle_size, config.max_particle_size),
            alpha: 1.0,
            color,
            drag: config.drag,
            fade: config.fade,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.vx, self.vy)
    }
}

/// Initial outward speed for a particle seeded `distance` pixels from the
/// shell centre.
pub fn dispersal_speed(distance: f32, config: &GlyphConfig) -> f32 {
    let reach = if config.speed_falloff > 0.0 {
        (distance / config.speed_falloff).clamp(0.0, 1.0)
    } else {
        1.0
    };
    config.min_speed + reach * (config.max_speed - config.min_speed)
}

impl Particle for GlyphParticle {
    fn update(&mut self, dt: f32) {
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        let damping = self.drag.powf(dt);
        self.vx *= damping;
        self.vy *= damping;
        self.alpha = fade(self.alpha, self.fade, dt);
    }

    fn draw(&self, surface: &mut dyn Surface) {
        surface.fill_circle(self.x, self.y, self.size, self.color, self.alpha);
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }
}

/// Owned particle collection with a single update-draw-prune pass.
#[derive(Debug, Clone)]
pub struct ParticlePool<P> {
    particles: Vec<P>,
}

impl<P> Default for ParticlePool<P> {
    fn default() -> Self {
        Self {
            particles: Vec::new(),
        }
    }
}

impl<P: Particle> ParticlePool<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, particle: P) {
        self.particles.push(particle);
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.particles.iter()
    }

    pub fn any_alive(&self) -> bool {
        self.particles.iter().any(|particle| particle.is_alive())
    }

    /// Advances every particle and drops the ones that die on this update.
    pub fn update(&mut self, dt: f32) {
        self.particles.retain_mut(|particle| {
            particle.update(dt);
            particle.is_alive()
        });
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        for particle in &self.particles {
            particle.draw(surface);
        }
    }

    /// Update-then-draw in one pass; dead particles are never drawn.
    pub fn step(&mut self, dt: f32, surface: &mut dyn Surface) {
        self.update(dt);
        self.draw(surface);
    }
}

impl<P> Extend<P> for ParticlePool<P> {
    fn extend<T: IntoIterator<Item = P>>(&mut self, iter: T) {
        self.particles.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::render::DrawLog;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn radial_alpha_strictly_decreases_until_zero() {
        let mut rng = rng();
        let mut particle = RadialParticle::spawn(&mut rng, 50.0, 50.0, Rgba::WHITE, &RadialConfig::default());

        let mut previous = particle.alpha();
        let mut frames = 0;
        while particle.is_alive() {
            particle.update(1.0);
            assert!(particle.alpha() < previous);
            previous = particle.alpha();
            frames += 1;
        }

        assert_eq!(particle.alpha(), 0.0);
        assert!((99..=101).contains(&frames));
    }

    #[test]
    fn radial_speed_decays_by_drag() {
        let mut rng = rng();
        let config = RadialConfig::default();
        let mut particle = RadialParticle::spawn(&mut rng, 0.0, 0.0, Rgba::WHITE, &config);
        let initial = particle.speed();
        assert!(initial >= config.min_speed && initial < config.max_speed);

        particle.update(1.0);
        assert_relative_eq!(particle.speed(), initial * 0.95, epsilon = 1e-5);

        particle.update(2.0);
        assert_relative_eq!(particle.speed(), initial * 0.95_f32.powi(3), epsilon = 1e-5);
    }

    #[test]
    fn fountain_particles_rise_then_fall() {
        let mut rng = rng();
        let config = FountainConfig::default();
        let mut particle = FountainParticle::spawn(&mut rng, 10.0, 100.0, Rgba::WHITE, &config);

        let (vx, vy) = particle.velocity();
        assert!(vx.abs() <= config.jitter / 2.0);
        assert!(vy <= -config.min_lift && vy > -config.max_lift);

        particle.update(1.0);
        assert!(particle.position().1 < 100.0);
        assert_relative_eq!(particle.velocity().1, vy + config.gravity, epsilon = 1e-6);

        for _ in 0..200 {
            particle.update(1.0);
        }
        assert!(particle.velocity().1 > 0.0);
        assert!(!particle.is_alive());
    }

    #[test]
    fn glyph_speed_grows_with_distance() {
        let config = GlyphConfig::default();
        let mut last = 0.0;
        for distance in [0.0, 5.0, 20.0, 50.0, 99.0, 100.0, 150.0, 400.0] {
            let speed = dispersal_speed(distance, &config);
            assert!(speed >= last);
            assert!(speed >= config.min_speed && speed <= config.max_speed);
            last = speed;
        }
        assert_relative_eq!(dispersal_speed(100.0, &config), config.max_speed, epsilon = 1e-6);
    }

    #[test]
    fn glyph_particles_move_away_from_centre() {
        let mut rng = rng();
        let config = GlyphConfig::default();
        let mut particle = GlyphParticle::seed(&mut rng, (130.0, 100.0), (100.0, 100.0), Rgba::WHITE, &config);

        let (vx, vy) = particle.velocity();
        assert!(vx > 0.0);
        assert_relative_eq!(vy, 0.0);
        assert_relative_eq!(vx, dispersal_speed(30.0, &config), epsilon = 1e-5);

        particle.update(1.0);
        assert!(particle.position().0 > 130.0);
        assert_relative_eq!(particle.velocity().0, vx * 0.98, epsilon = 1e-5);
    }

    #[test]
    fn centred_glyph_particle_still_moves_at_min_speed() {
        let mut rng = rng();
        let config = GlyphConfig::default();
        let particle = GlyphParticle::seed(&mut rng, (100.0, 100.0), (100.0, 100.0), Rgba::WHITE, &config);

        let (vx, vy) = particle.velocity();
        assert_relative_eq!(vx.hypot(vy), config.min_speed, epsilon = 1e-6);
    }

    #[test]
    fn pool_prunes_dead_particles_in_the_same_pass() {
        let mut rng = rng();
        let config = FountainConfig {
            fade: 0.5,
            ..FountainConfig::default()
        };
        let mut pool = ParticlePool::new();
        pool.extend((0..3).map(|_| FountainParticle::spawn(&mut rng, 0.0, 0.0, Rgba::WHITE, &config)));
        let mut surface = DrawLog::new(100, 100);

        pool.step(1.0, &mut surface);
        assert_eq!(pool.len(), 3);
        assert_eq!(surface.circles.len(), 3);

        pool.step(1.0, &mut surface);
        assert!(pool.is_empty());
        assert_eq!(surface.circles.len(), 3);
        assert!(!pool.any_alive());
    }
}
