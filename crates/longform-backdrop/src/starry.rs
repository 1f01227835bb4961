#![forbid(unsafe_code)]

//! Twinkling star field with occasional shooting stars.
//!
//! Stars live in world coordinates and pulse on independent sine waves;
//! the brighter ones get a cross-shaped flare. Shooting stars are a
//! screen-space effect: they enter from a random edge, streak toward the
//! central region of the viewport, and burn out over their lifetime,
//! leaving a tapered trail. In dark mode the sky behind the stars gets a
//! vertical night gradient.

use longform_core::geometry::Viewport;

use crate::palette::{Palette, SHOOTING_STAR, STAR_COLORS_DARK};
use crate::rng::SeededRng;
use crate::surface::Surface;
use crate::world::{
    Backdrop, CULL_MARGIN, FrameCtx, FramePacer, HeightWatcher, entity_count, world_height,
};

const FLARE_THRESHOLD: f32 = 1.5;
const EDGE_OFFSET: f32 = 50.0;
const TRAIL_LENGTH: usize = 15;
const GLOW_BLUR: f32 = 10.0;

/// Tunables for the starry scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarryParams {
    /// Stars per pixel of viewport area.
    pub density: f64,
    /// Hard cap on the star population.
    pub max_stars: usize,
    /// Per-frame probability of launching a shooting star.
    pub shooting_frequency: f64,
    /// Most shooting stars alive at once.
    pub max_shooting: usize,
}

impl Default for StarryParams {
    fn default() -> Self {
        Self {
            density: 6e-5,
            max_stars: 600,
            shooting_frequency: 0.004,
            max_shooting: 5,
        }
    }
}

impl StarryParams {
    /// Override the population density.
    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Override the population cap.
    #[must_use]
    pub fn with_max_stars(mut self, max_stars: usize) -> Self {
        self.max_stars = max_stars;
        self
    }

    /// Override the shooting-star launch probability.
    #[must_use]
    pub fn with_shooting_frequency(mut self, shooting_frequency: f64) -> Self {
        self.shooting_frequency = shooting_frequency;
        self
    }

    /// Override the live shooting-star cap.
    #[must_use]
    pub fn with_max_shooting(mut self, max_shooting: usize) -> Self {
        self.max_shooting = max_shooting;
        self
    }
}

/// One fixed star, positioned in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    pub base_size: f32,
    pub size: f32,
    pub opacity: f32,
    pub twinkle_speed: f32,
    pub twinkle_phase: f32,
    /// Index into the palette's star colors, resolved at draw time so a
    /// theme change recolors the sky without regenerating.
    pub color_index: usize,
}

fn twinkle(star: &mut Star) {
    let t = (star.twinkle_phase.sin() + 1.0) / 2.0;
    star.size = star.base_size * (0.8 + 0.4 * t);
    star.opacity = 0.3 + 0.5 * t;
}

/// New star at a random point in the world, with a random twinkle
/// cadence and starting phase.
pub fn spawn_star(rng: &mut SeededRng, viewport: Viewport, doc_height: f32) -> Star {
    let world_h = world_height(viewport, doc_height);
    let mut star = Star {
        x: rng.range_f32(0.0, viewport.width),
        y: rng.range_f32(0.0, world_h),
        base_size: rng.range_f32(0.5, 2.5),
        size: 0.0,
        opacity: 0.0,
        twinkle_speed: rng.range_f32(0.01, 0.03),
        twinkle_phase: rng.range_f32(0.0, std::f32::consts::TAU),
        color_index: rng.pick_index(STAR_COLORS_DARK.len()),
    };
    twinkle(&mut star);
    star
}

/// Advance one star by one frame of twinkle.
pub fn update_star(star: &mut Star) {
    star.twinkle_phase += star.twinkle_speed;
    twinkle(star);
}

/// Whether a star falls inside the visible band around the viewport.
pub fn star_visible(star: &Star, viewport: Viewport, scroll_y: f32) -> bool {
    viewport
        .visible_band(scroll_y, CULL_MARGIN)
        .contains(star.y)
}

/// Draw one star at its screen position. Stars above the flare
/// threshold get a four-pointed cross through the core.
pub fn draw_star(star: &Star, scroll_y: f32, palette: Palette, surface: &mut dyn Surface) {
    let color = palette.star_colors()[star.color_index];
    let sy = star.y - scroll_y;
    surface.fill_circle(star.x, sy, star.size, color.with_opacity(star.opacity));
    if star.base_size > FLARE_THRESHOLD {
        let arm = star.size * 3.0;
        let flare = color.with_opacity(star.opacity * 0.6);
        surface.stroke_line(star.x - arm, sy, star.x + arm, sy, 0.5, flare);
        surface.stroke_line(star.x, sy - arm, star.x, sy + arm, 0.5, flare);
    }
}

// ---------------------------------------------------------------------------
// Shooting stars
// ---------------------------------------------------------------------------

/// One recorded point of a shooting star's trail, in screen coordinates.
/// Carries the head opacity at the moment the point was laid down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
}

/// A meteor streaking across the screen. Lives entirely in screen
/// coordinates and ignores scrolling.
#[derive(Debug, Clone, PartialEq)]
pub struct ShootingStar {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub opacity: f32,
    pub life: f32,
    pub max_life: f32,
    pub trail: Vec<TrailPoint>,
}

/// New shooting star just outside a random viewport edge, aimed at a
/// random point in the central 30-70% region.
pub fn spawn_shooting_star(rng: &mut SeededRng, viewport: Viewport) -> ShootingStar {
    let (x, y) = match rng.pick_index(4) {
        0 => (rng.range_f32(0.0, viewport.width), -EDGE_OFFSET),
        1 => (viewport.width + EDGE_OFFSET, rng.range_f32(0.0, viewport.height)),
        2 => (rng.range_f32(0.0, viewport.width), viewport.height + EDGE_OFFSET),
        _ => (-EDGE_OFFSET, rng.range_f32(0.0, viewport.height)),
    };
    let tx = rng.range_f32(viewport.width * 0.3, viewport.width * 0.7);
    let ty = rng.range_f32(viewport.height * 0.3, viewport.height * 0.7);
    let (dx, dy) = (tx - x, ty - y);
    // The spawn point sits outside the viewport and the target inside
    // it, so the length is never zero.
    let length = (dx * dx + dy * dy).sqrt();
    let speed = rng.range_f32(3.0, 7.0);
    let max_life = rng.range_f32(60.0, 120.0);
    ShootingStar {
        x,
        y,
        vx: dx / length * speed,
        vy: dy / length * speed,
        size: rng.range_f32(1.0, 3.0),
        opacity: 1.0,
        life: max_life,
        max_life,
        trail: Vec::new(),
    }
}

/// Advance one shooting star by one frame: move, burn one frame of
/// life, append to the trail.
pub fn update_shooting_star(star: &mut ShootingStar) {
    star.x += star.vx;
    star.y += star.vy;
    star.life -= 1.0;
    star.opacity = (star.life / star.max_life).max(0.0);
    star.trail.push(TrailPoint {
        x: star.x,
        y: star.y,
        opacity: star.opacity,
    });
    if star.trail.len() > TRAIL_LENGTH {
        star.trail.remove(0);
    }
}

/// Draw the trail, oldest point first and smallest, then the glowing
/// head.
pub fn draw_shooting_star(star: &ShootingStar, surface: &mut dyn Surface) {
    let count = star.trail.len();
    for (index, point) in star.trail.iter().enumerate() {
        let taper = index as f32 / count as f32;
        surface.fill_circle(
            point.x,
            point.y,
            star.size * taper,
            SHOOTING_STAR.with_opacity(taper * point.opacity * 0.5),
        );
    }
    surface.glow_circle(
        star.x,
        star.y,
        star.size,
        GLOW_BLUR,
        SHOOTING_STAR.with_opacity(star.opacity),
    );
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// The starry backdrop.
///
/// Star visibility is cached and recomputed every fourth frame, and
/// immediately after any regeneration. Shooting stars bypass the cache;
/// there are never more than a handful.
#[derive(Debug, Clone)]
pub struct StarryField {
    params: StarryParams,
    stars: Vec<Star>,
    shooting: Vec<ShootingStar>,
    visible: Vec<usize>,
    cache_dirty: bool,
    frame_counter: u64,
    rng: SeededRng,
    pacer: FramePacer,
    watcher: HeightWatcher,
}

impl Default for StarryField {
    fn default() -> Self {
        Self::new()
    }
}

impl StarryField {
    /// Empty field with default tunables. The first frame populates it
    /// for the observed dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(StarryParams::default())
    }

    /// Empty field with explicit tunables.
    #[must_use]
    pub fn with_params(params: StarryParams) -> Self {
        Self {
            params,
            stars: Vec::new(),
            shooting: Vec::new(),
            visible: Vec::new(),
            cache_dirty: true,
            frame_counter: 0,
            rng: SeededRng::new(0),
            pacer: FramePacer::new(),
            watcher: HeightWatcher::new(),
        }
    }

    /// Current star population.
    #[must_use]
    pub fn star_count(&self) -> usize {
        self.stars.len()
    }

    /// Shooting stars currently alive.
    #[must_use]
    pub fn shooting_count(&self) -> usize {
        self.shooting.len()
    }

    fn rebuild_visible(&mut self, ctx: &FrameCtx) {
        self.visible.clear();
        self.visible.extend(
            self.stars
                .iter()
                .enumerate()
                .filter(|(_, star)| star_visible(star, ctx.viewport, ctx.scroll_y))
                .map(|(index, _)| index),
        );
        self.cache_dirty = false;
    }
}

impl Backdrop for StarryField {
    fn name(&self) -> &'static str {
        "starry"
    }

    fn regenerate(&mut self, viewport: Viewport, doc_height: f32, seed: u64) {
        self.rng = SeededRng::new(seed);
        let count = entity_count(viewport, doc_height, self.params.density, self.params.max_stars);
        self.stars = (0..count)
            .map(|_| spawn_star(&mut self.rng, viewport, doc_height))
            .collect();
        self.shooting.clear();
        self.watcher.prime(doc_height);
        self.cache_dirty = true;
        tracing::debug!(count, "regenerated star field");
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

        if let Some(stops) = ctx.palette.night_gradient() {
            surface.fill_vertical_gradient(stops);
        }

        if self.cache_dirty || self.frame_counter % 4 == 0 {
            self.rebuild_visible(ctx);
        }
        for slot in 0..self.visible.len() {
            let index = self.visible[slot];
            update_star(&mut self.stars[index]);
        }
        for &index in &self.visible {
            draw_star(&self.stars[index], ctx.scroll_y, ctx.palette, surface);
        }

        if self.rng.chance(self.params.shooting_frequency)
            && self.shooting.len() < self.params.max_shooting
        {
            let star = spawn_shooting_star(&mut self.rng, ctx.viewport);
            self.shooting.push(star);
        }
        for star in &mut self.shooting {
            update_shooting_star(star);
        }
        // Dying stars still get their last frame on screen.
        for star in &self.shooting {
            draw_shooting_star(star, surface);
        }
        self.shooting.retain(|star| star.life > 0.0);
    }
}
