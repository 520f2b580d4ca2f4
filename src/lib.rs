// Wayframe
//
// Single-window compositor core: outputs, seat input, views and focus,
// idle inhibition. Rendering and wire protocols plug in through the
// `Backend` and `Protocol` traits.

pub mod config;
pub mod core;
pub mod platform;
pub mod util;

#[cfg(test)]
mod tests;
