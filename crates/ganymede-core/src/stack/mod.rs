pub mod median;

pub use median::{median_stack, median_value};
