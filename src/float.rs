//! Floating point bound shared by every routine of the crate
use ndarray::ScalarOperand;
use num_traits::{FromPrimitive, NumAssignOps, NumCast};
use rand::distributions::uniform::SampleUniform;

use std::fmt;
use std::iter::Sum;

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. Point sets, weight matrices and
/// correlation scores are all generic over it.
pub trait Float:
    FromPrimitive
    + num_traits::Float
    + PartialOrd
    + Sync
    + Send
    + Default
    + fmt::Display
    + fmt::Debug
    + Sum
    + NumAssignOps
    + SampleUniform
    + ScalarOperand
    + approx::AbsDiffEq
    + 'static
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}

impl Float for f64 {}
