//! Configuration management for credo
//!
//! credo reads two files:
//!
//! 1. **Spell manifest** (`credospell.toml`): the project's committed spells,
//!    see [`crate::manifest`]. Safe for version control.
//! 2. **Global configuration** (`~/.credo/config.toml`): user-wide settings
//!    such as the cache directory, see [`GlobalConfig`].

mod global;

pub use global::GlobalConfig;
