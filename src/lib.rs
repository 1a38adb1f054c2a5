//! Gridfold removes blank rows and columns from screenshots of tables.
//!
//! The pipeline is value-oriented: every operation takes its inputs and
//! returns new values, nothing holds hidden mutable state.
//!
//! - [`decode_image`] turns encoded bytes into a [`PixelBuffer`]
//! - [`detect`] scans the pixels for the table's line grid
//! - [`resolve_cells`] flood-fills the grid lattice into actual (possibly
//!   merged) cell rectangles
//! - [`erase`] applies one manual eraser action to a grid
//! - [`crop`] folds selected regions out of the image in two passes and
//!   remaps the grid into the new coordinate space, so edits compose
#![forbid(unsafe_code)]

mod foundation;

pub mod buffer;
pub mod composite;
pub mod decode;
pub mod detect;
pub mod eraser;
pub mod grid;
pub mod lattice;
pub mod seam;

pub use crate::foundation::core::{Axis, Point, Rect};
pub use crate::foundation::error::{GridfoldError, GridfoldResult};

pub use crate::buffer::PixelBuffer;
pub use crate::composite::{CropMode, CropOutput, crop};
pub use crate::decode::{decode_image, encode_png};
pub use crate::detect::detect;
pub use crate::eraser::erase;
pub use crate::grid::{Grid, GridLine};
pub use crate::lattice::resolve_cells;
pub use crate::seam::{DrawOp, plan};
