pub mod clean;
pub mod report;
pub mod sensitivity;
pub mod stats;

pub use clean::{clean_games, CleanOptions, CleanReport};
pub use report::{render_extraction, render_flips, render_summary};
pub use sensitivity::{flipped, sweep, Swing};
pub use stats::summarize;
