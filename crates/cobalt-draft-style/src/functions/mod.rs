//! Declaration-value function expansion.

mod calc;
mod processor;

pub use processor::{FunctionProcessor, MAX_RECURSION_DEPTH};
