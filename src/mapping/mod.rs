// Map and sensor simulation module

pub mod ray_casting;
pub mod vector_map;

pub use ray_casting::*;
pub use vector_map::*;
