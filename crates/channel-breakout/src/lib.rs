pub mod breakout;
pub mod channel;
pub mod config;
pub mod detector;
pub mod indicators;
pub mod momentum;
pub mod report;
pub mod retest;
pub mod scanner;
pub mod signal;

#[cfg(test)]
mod fixtures;

pub use breakout::*;
pub use channel::*;
pub use config::*;
pub use detector::*;
pub use indicators::*;
pub use momentum::*;
pub use report::*;
pub use retest::*;
pub use scanner::*;
pub use signal::*;
