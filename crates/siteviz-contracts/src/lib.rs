pub mod events;
pub mod extract;
pub mod geometry;
pub mod pipeline;
pub mod runs;
pub mod session;
