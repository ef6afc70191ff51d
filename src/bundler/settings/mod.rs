//! Configuration structures for pipeline runs.
//!
//! Settings are usually loaded from `bundle.toml` (see [`crate::metadata`])
//! and can be built directly with [`SettingsBuilder`].

mod builder;
mod core;
mod generator;
mod natives;
mod package;
mod relocation;

pub use builder::SettingsBuilder;
pub use core::Settings;
pub use generator::GeneratorSettings;
pub use natives::NativeSource;
pub use package::PackageSettings;
pub use relocation::RelocationSettings;
