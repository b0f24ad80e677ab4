pub mod directory;

pub use directory::PhysicianDirectory;
