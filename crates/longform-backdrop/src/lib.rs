#![forbid(unsafe_code)]

//! Scroll-aware animated backdrops:
//! - [`particle`] - drifting dust motes joined by proximity links
//! - [`starry`] - twinkling stars, night gradient, shooting stars
//! - [`world`] - world model, entity counts, frame pacing, height watch
//! - [`surface`] - the drawing abstraction plus raster and recording impls
//!
//! Both backdrops implement the [`Backdrop`] trait: seed-deterministic
//! regeneration plus a per-frame `frame` call that takes the scroll
//! position, pointer, and palette as plain inputs. Nothing here owns a
//! clock or a canvas, so the whole simulation runs under test against a
//! [`Recording`] surface.
//!
//! # Example
//! ```
//! use std::time::Instant;
//!
//! use longform_backdrop::{Backdrop, FrameCtx, Palette, ParticleField, Recording, Viewport};
//!
//! let viewport = Viewport::new(1280.0, 720.0);
//! let mut field = ParticleField::new();
//! field.regenerate(viewport, 2400.0, 42);
//!
//! let ctx = FrameCtx {
//!     now: Instant::now(),
//!     scroll_y: 0.0,
//!     viewport,
//!     doc_height: 2400.0,
//!     pointer: None,
//!     palette: Palette::dark(),
//! };
//! let mut surface = Recording::new(viewport.width, viewport.height);
//! field.frame(&ctx, &mut surface);
//! assert!(!surface.ops().is_empty());
//! ```

pub mod color;
pub mod palette;
pub mod particle;
pub mod rng;
pub mod starry;
pub mod surface;
pub mod world;

pub use color::Rgba;
pub use longform_core::geometry::Viewport;
pub use palette::{Mode, Palette};
pub use particle::{ParticleField, ParticleParams};
pub use rng::SeededRng;
pub use starry::{StarryField, StarryParams};
pub use surface::{DrawOp, Raster, Recording, Surface};
pub use world::{Backdrop, CULL_MARGIN, FrameCtx, FramePacer, HeightWatcher};
