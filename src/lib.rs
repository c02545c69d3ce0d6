pub mod candidates;
pub mod config;
pub mod core;
pub mod hotkeys;
pub mod icon_queue;
pub mod manifest;
pub mod pixels;
pub mod qualifiers;
pub mod ranking;
pub mod resolver;

// Windows-only modules
#[cfg(windows)]
pub mod bitmap;
#[cfg(windows)]
pub mod display;
#[cfg(windows)]
pub mod menu;
#[cfg(windows)]
pub mod package;
#[cfg(windows)]
pub mod tray;
#[cfg(windows)]
pub mod winlist;
