/// Scene module - the quad drawn by the sandbox

pub mod quad_scene;
pub mod vertex;

pub use quad_scene::*;
pub use vertex::*;
