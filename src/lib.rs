pub mod data;
pub mod deformer;
mod math;
pub mod matrix;
pub mod store;

pub use data::DeformerState;
pub use deformer::convert::TWEAK_EPSILON;
pub use deformer::estimate::{estimate_inversion, DeformChain, InactiveChainError};
pub use deformer::{Authority, InvertedBlendShape};
