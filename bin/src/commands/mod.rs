pub mod locate;
pub mod render;
