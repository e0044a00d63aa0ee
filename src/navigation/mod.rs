//! Guidance engine: legs, progress, speed and zones

pub mod event;
pub mod fix;
pub mod options;
pub mod segment;
pub mod session;
pub mod speaker;
pub mod speed;
pub mod tracker;
pub mod zones;

#[cfg(test)]
mod tests;
