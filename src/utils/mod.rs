//! Filesystem helpers shared by the manifest, the cache and the modules.
//!
//! # Example
//!
//! ```rust,no_run
//! use credo_cli::utils::{atomic_write, ensure_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("apt"))?;
//! atomic_write(Path::new("credospell.toml"), b"")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;

pub use fs::{atomic_write, ensure_dir, sha256_file};
