#![forbid(unsafe_code)]

//! Drifting particle field with proximity links.
//!
//! Particles wander the world under a small random jitter, slowed by
//! friction and clamped to a narrow speed band so the field never goes
//! still and never races. The pointer repels nearby particles, and
//! particles within linking distance of each other are joined by faint
//! lines whose opacity fades with distance.

use longform_core::geometry::Viewport;

use crate::palette::{LINK_LINE, PARTICLE_COLORS};
use crate::rng::SeededRng;
use crate::surface::Surface;
use crate::world::{
    Backdrop, CULL_MARGIN, FrameCtx, FramePacer, HeightWatcher, entity_count, world_height,
};

use crate::color::Rgba;

const REPEL_RADIUS: f32 = 80.0;
const REPEL_STRENGTH: f32 = 0.002;
const JITTER: f32 = 0.0001;
const FRICTION: f32 = 0.9995;
const MAX_SPEED: f32 = 0.8;
const MIN_SPEED: f32 = 0.05;

/// Tunables for the particle scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleParams {
    /// Particles per pixel of viewport area.
    pub density: f64,
    /// Hard cap on the particle population.
    pub max_particles: usize,
    /// Maximum distance, in pixels, at which two particles are linked.
    pub connection_distance: f32,
    /// Maximum number of link lines drawn per frame.
    pub max_connections: usize,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            density: 2e-5,
            max_particles: 500,
            connection_distance: 100.0,
            max_connections: 50,
        }
    }
}

impl ParticleParams {
    /// Override the population density.
    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Override the population cap.
    #[must_use]
    pub fn with_max_particles(mut self, max_particles: usize) -> Self {
        self.max_particles = max_particles;
        self
    }

    /// Override the linking distance.
    #[must_use]
    pub fn with_connection_distance(mut self, connection_distance: f32) -> Self {
        self.connection_distance = connection_distance;
        self
    }

    /// Override the per-frame link cap.
    #[must_use]
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// One dust mote, positioned in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub opacity: f32,
    pub color: Rgba,
}

/// New particle at a random point in the world, with a slow random
/// drift. Color is fixed at spawn and does not follow the theme.
pub fn spawn_particle(rng: &mut SeededRng, viewport: Viewport, doc_height: f32) -> Particle {
    let world_h = world_height(viewport, doc_height);
    Particle {
        x: rng.range_f32(0.0, viewport.width),
        y: rng.range_f32(0.0, world_h),
        vx: rng.range_f32(-0.25, 0.25),
        vy: rng.range_f32(-0.25, 0.25),
        size: rng.range_f32(1.0, 3.0),
        opacity: rng.range_f32(0.4, 1.0),
        color: PARTICLE_COLORS[rng.pick_index(PARTICLE_COLORS.len())],
    }
}

/// Advance one particle by one frame: pointer repulsion, jitter,
/// friction, speed clamping, and wall bounces against the world bounds.
pub fn update_particle(particle: &mut Particle, ctx: &FrameCtx, rng: &mut SeededRng) {
    if let Some((px, py)) = ctx.pointer {
        // The pointer lives in screen space; compare against the
        // particle's on-screen position.
        let dx = particle.x - px;
        let dy = (particle.y - ctx.scroll_y) - py;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > 0.0 && distance < REPEL_RADIUS {
            let force = (REPEL_RADIUS - distance) / REPEL_RADIUS;
            particle.vx += (dx / distance) * force * REPEL_STRENGTH;
            particle.vy += (dy / distance) * force * REPEL_STRENGTH;
        }
    }

    particle.vx += (rng.next_f32() - 0.5) * JITTER;
    particle.vy += (rng.next_f32() - 0.5) * JITTER;

    particle.x += particle.vx;
    particle.y += particle.vy;

    particle.vx *= FRICTION;
    particle.vy *= FRICTION;

    let speed = (particle.vx * particle.vx + particle.vy * particle.vy).sqrt();
    if speed > MAX_SPEED {
        let scale = MAX_SPEED / speed;
        particle.vx *= scale;
        particle.vy *= scale;
    } else if speed > 0.0 && speed < MIN_SPEED {
        let scale = MIN_SPEED / speed;
        particle.vx *= scale;
        particle.vy *= scale;
    }

    let world_h = world_height(ctx.viewport, ctx.doc_height);
    if particle.x < 0.0 || particle.x > ctx.viewport.width {
        particle.vx = -particle.vx;
        particle.x = particle.x.clamp(0.0, ctx.viewport.width);
    }
    if particle.y < 0.0 || particle.y > world_h {
        particle.vy = -particle.vy;
        particle.y = particle.y.clamp(0.0, world_h);
    }
}

/// Whether a particle falls inside the visible band around the
/// viewport.
pub fn particle_visible(particle: &Particle, viewport: Viewport, scroll_y: f32) -> bool {
    viewport
        .visible_band(scroll_y, CULL_MARGIN)
        .contains(particle.y)
}

/// Draw one particle at its screen position.
pub fn draw_particle(particle: &Particle, scroll_y: f32, surface: &mut dyn Surface) {
    surface.fill_circle(
        particle.x,
        particle.y - scroll_y,
        particle.size,
        particle.color.with_opacity(particle.opacity),
    );
}

/// Opacity of a link line between two particles `distance` apart, with
/// links reaching at most `reach` pixels.
pub fn link_opacity(distance: f32, reach: f32) -> f32 {
    (reach - distance) / reach * 0.4
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// The particle backdrop.
///
/// Holds the particle population plus a visibility cache: the set of
/// on-screen particles is recomputed every third frame rather than every
/// frame, and immediately after any regeneration.
#[derive(Debug, Clone)]
pub struct ParticleField {
    params: ParticleParams,
    particles: Vec<Particle>,
    visible: Vec<usize>,
    cache_dirty: bool,
    frame_counter: u64,
    rng: SeededRng,
    pacer: FramePacer,
    watcher: HeightWatcher,
}

impl Default for ParticleField {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleField {
    /// Empty field with default tunables. The first frame populates it
    /// for the observed dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(ParticleParams::default())
    }

    /// Empty field with explicit tunables.
    #[must_use]
    pub fn with_params(params: ParticleParams) -> Self {
        Self {
            params,
            particles: Vec::new(),
            visible: Vec::new(),
            cache_dirty: true,
            frame_counter: 0,
            rng: SeededRng::new(0),
            pacer: FramePacer::new(),
            watcher: HeightWatcher::new(),
        }
    }

    /// Current population size.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    fn rebuild_visible(&mut self, ctx: &FrameCtx) {
        self.visible.clear();
        self.visible.extend(
            self.particles
                .iter()
                .enumerate()
                .filter(|(_, p)| particle_visible(p, ctx.viewport, ctx.scroll_y))
                .map(|(index, _)| index),
        );
        self.cache_dirty = false;
    }

    fn draw_connections(&self, ctx: &FrameCtx, surface: &mut dyn Surface) {
        let reach = self.params.connection_distance;
        let mut drawn = 0usize;
        for (slot, &a) in self.visible.iter().enumerate() {
            if drawn >= self.params.max_connections {
                break;
            }
            let pa = &self.particles[a];
            let (ax, ay) = (pa.x, pa.y - ctx.scroll_y);
            for &b in &self.visible[slot + 1..] {
                if drawn >= self.params.max_connections {
                    break;
                }
                let pb = &self.particles[b];
                let (bx, by) = (pb.x, pb.y - ctx.scroll_y);
                let (dx, dy) = (ax - bx, ay - by);
                let distance = (dx * dx + dy * dy).sqrt();
                if distance < reach {
                    let color = LINK_LINE.with_opacity(link_opacity(distance, reach));
                    surface.stroke_line(ax, ay, bx, by, 1.0, color);
                    drawn += 1;
                }
            }
        }
    }
}

impl Backdrop for ParticleField {
    fn name(&self) -> &'static str {
        "particle"
    }

    fn regenerate(&mut self, viewport: Viewport, doc_height: f32, seed: u64) {
        self.rng = SeededRng::new(seed);
        let count = entity_count(
            viewport,
            doc_height,
            self.params.density,
            self.params.max_particles,
        );
        self.particles = (0..count)
            .map(|_| spawn_particle(&mut self.rng, viewport, doc_height))
            .collect();
        self.watcher.prime(doc_height);
        self.cache_dirty = true;
        tracing::debug!(count, "regenerated particle field");
    }

    fn frame(&mut self, ctx: &FrameCtx, surface: &mut dyn Surface) {
        if !self.pacer.admit(ctx.now) {
            return;
        }
        if self.watcher.observe(ctx.now, ctx.doc_height, ctx.viewport) {
            let seed = self.rng.next_u64();
            self.regenerate(ctx.viewport, ctx.doc_height, seed);
        }
        self.frame_counter += 1;
        surface.clear();

        if self.cache_dirty || self.frame_counter % 3 == 0 {
            self.rebuild_visible(ctx);
        }
        for slot in 0..self.visible.len() {
            let index = self.visible[slot];
            update_particle(&mut self.particles[index], ctx, &mut self.rng);
        }
        for &index in &self.visible {
            draw_particle(&self.particles[index], ctx.scroll_y, surface);
        }
        self.draw_connections(ctx, surface);
    }
}
