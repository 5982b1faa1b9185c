pub mod analyses;
pub mod trigger;
