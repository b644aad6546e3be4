pub mod collapse;
pub mod grid;
pub mod model;
pub mod tile;

#[cfg(feature = "vis")]
pub mod vis;
