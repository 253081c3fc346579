//! Plain data types shared by graphics components.

pub mod rgba;
pub mod volume;

pub use rgba::Rgba;
pub use volume::Volume;
