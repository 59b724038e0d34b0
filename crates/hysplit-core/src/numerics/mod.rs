pub mod colormap;
pub mod logscale;
pub mod ticks;

pub use colormap::jet_hex_colors;
pub use logscale::{LogField, log10_remap};
pub use ticks::MaxNLocator;
