//! A small 2D presentation engine for constrained devices: an archive-backed
//! read-only filesystem, an alpha-aware RLE image compiler/blitter, a sprite
//! manager with automatic background save/restore, and a fixed-rate audio
//! mixer.
//!
//! The crate core (archive parsing, image compile/blit/unblit/stamp, the
//! sprite set, PRNG, hashing, and mixer arithmetic) needs only `alloc`; the
//! `std` feature (on by default) adds PNG/JPEG/WAV decode convenience and
//! audio resampling on top, since those genuinely need `std::io`-shaped
//! adapters around an in-memory archive slice.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod alloc_hook;
pub mod archive;
pub mod canvas;
pub mod config;
pub mod djb2;
pub mod error;
pub mod font;
pub mod image;
pub(crate) mod logging;
pub mod pixel_source;
pub mod rand;
pub mod sound;
pub mod sprite;

pub use alloc_hook::AllocHook;
#[cfg(feature = "std")]
pub use alloc_hook::set_alloc_hook;
pub use archive::{Archive, FileHandle, SeekFrom};
pub use canvas::{rgb565, Canvas};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use image::Image;
pub use pixel_source::{Argb8888, PixelSource};
pub use rand::Rng;
pub use sound::{Mixer, Sound, VoiceHandle};
pub use sprite::{Sprite, SpriteSet};
