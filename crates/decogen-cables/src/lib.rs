pub mod bulbs;
pub mod chains;
pub mod curve;
pub mod pool;

pub use chains::{ChainEngine, ChainObserver};
pub use curve::Anchor;
