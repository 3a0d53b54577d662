//! Deck configuration
//!
//! All tunables that were once scattered debug knobs live in one
//! [`DeckConfig`], injected when a deck is constructed:
//!
//! - Render smoothing/gate/slew time constants
//! - Transport guard windows and the cue hold threshold
//! - Fling thresholds, decay and overlap point
//! - Resume preload lead and crossfade length
//! - Platter gesture sensitivity
//!
//! # Usage
//!
//! ```ignore
//! use platter_core::config::{default_config_path, load_config, save_config, DeckConfig};
//!
//! let path = default_config_path();
//! let config: DeckConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod deck;
mod io;
mod paths;

pub use deck::{
    DeckConfig, FlingConfig, GestureConfig, RenderConfig, ResumeConfig, TransportConfig,
};
pub use io::{load_config, save_config, try_load_config};
pub use paths::{config_dir, default_config_path, CONFIG_FILE_NAME};
