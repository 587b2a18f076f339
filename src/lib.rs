#![allow(dead_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(rust_2018_idioms, clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::unreadable_literal
)]

pub mod doc;
pub mod export;
pub mod render;

pub(crate) mod block;
pub(crate) mod internals;

pub use doc::{Document, Error, Layer, Result, Stroke};
