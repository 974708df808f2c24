pub mod atr;
pub mod cluster;
pub mod pivots;
pub mod signal;

pub use atr::{compute_atr, true_range};
pub use cluster::cluster_last_level;
pub use pivots::detect_pivots;
pub use signal::{breakout_signal, classify};
