//! Build-host platform classification.
//!
//! A [`PlatformClass`] names an OS/architecture pair and the file-naming
//! convention of native libraries built for it. Classification goes through
//! an explicit table; hosts outside the table are reported as
//! [`Probe::Unsupported`] and the caller's [`PlatformPolicy`] decides whether
//! that is fatal.

mod verify;

pub use verify::{BinaryCheck, check_binary};
#[cfg(test)]
pub(crate) use verify::tests::elf_x86_64_stub;

use crate::bundler::{Error, Result, Warning};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported native platform classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlatformClass {
    /// Apple Silicon macOS
    #[serde(rename = "darwin-aarch64")]
    DarwinAarch64,
    /// 64-bit Intel/AMD Linux
    #[serde(rename = "linux-x86-64")]
    LinuxX86_64,
}

impl PlatformClass {
    /// Every class in the table.
    pub const ALL: [PlatformClass; 2] = [PlatformClass::DarwinAarch64, PlatformClass::LinuxX86_64];

    /// Class used when a host is unrecognized under the lenient policy.
    pub const FALLBACK: PlatformClass = PlatformClass::DarwinAarch64;

    /// Directory name inside the package (`darwin-aarch64`, `linux-x86-64`).
    pub fn identifier(self) -> &'static str {
        match self {
            Self::DarwinAarch64 => "darwin-aarch64",
            Self::LinuxX86_64 => "linux-x86-64",
        }
    }

    /// Native library extension without the dot.
    pub fn library_extension(self) -> &'static str {
        match self {
            Self::DarwinAarch64 => "dylib",
            Self::LinuxX86_64 => "so",
        }
    }

    /// Glob selecting native binaries for this class.
    pub fn library_glob(self) -> String {
        format!("*.{}", self.library_extension())
    }

    /// File name of the native library `name` for this class.
    pub fn library_file_name(self, name: &str) -> String {
        format!("lib{}.{}", name, self.library_extension())
    }
}

impl fmt::Display for PlatformClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for PlatformClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.identifier() == s)
            .ok_or_else(|| {
                Error::GenericError(format!(
                    "unknown platform class `{s}` (expected one of: {})",
                    Self::ALL.map(|c| c.identifier()).join(", ")
                ))
            })
    }
}

/// Outcome of classifying an OS identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    /// The identifier matched a table entry.
    Matched(PlatformClass),
    /// No table entry matched.
    Unsupported(String),
}

/// What to do with a host outside the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformPolicy {
    /// Fall back to [`PlatformClass::FALLBACK`] and record a warning.
    #[default]
    Lenient,
    /// Fail with [`Error::PlatformUnsupported`].
    Strict,
}

/// Substring table, checked in order.
const PLATFORM_TABLE: &[(&str, PlatformClass)] = &[
    ("linux", PlatformClass::LinuxX86_64),
    ("darwin", PlatformClass::DarwinAarch64),
    ("mac", PlatformClass::DarwinAarch64),
];

/// Classifies an OS identifier by case-insensitive substring match.
pub fn classify(os: &str) -> Probe {
    let lowered = os.to_lowercase();
    PLATFORM_TABLE
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map_or_else(|| Probe::Unsupported(os.to_string()), |(_, class)| Probe::Matched(*class))
}

/// Resolves an OS identifier to a class under `policy`.
///
/// Under [`PlatformPolicy::Lenient`] an unsupported host resolves to
/// [`PlatformClass::FALLBACK`] and a [`Warning::PlatformUnrecognized`] is
/// returned alongside it.
pub fn resolve(os: &str, policy: PlatformPolicy) -> Result<(PlatformClass, Option<Warning>)> {
    match (classify(os), policy) {
        (Probe::Matched(class), _) => Ok((class, None)),
        (Probe::Unsupported(os), PlatformPolicy::Strict) => Err(Error::PlatformUnsupported { os }),
        (Probe::Unsupported(os), PlatformPolicy::Lenient) => {
            let warning = Warning::PlatformUnrecognized {
                os,
                fallback: PlatformClass::FALLBACK,
            };
            log::warn!("{warning}");
            Ok((PlatformClass::FALLBACK, Some(warning)))
        }
    }
}

/// Identifier of the running host, as reported by the standard library.
pub fn host_os() -> &'static str {
    std::env::consts::OS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_in_any_case_is_linux() {
        for os in ["linux", "Linux", "GNU/LINUX", "ubuntu-linux-gnu"] {
            assert_eq!(classify(os), Probe::Matched(PlatformClass::LinuxX86_64), "{os}");
        }
    }

    #[test]
    fn everything_else_resolves_to_darwin_when_lenient() {
        for os in ["macos", "Mac OS X", "windows", "freebsd", ""] {
            let (class, _) = resolve(os, PlatformPolicy::Lenient).unwrap();
            assert_eq!(class, PlatformClass::DarwinAarch64, "{os}");
        }
    }

    #[test]
    fn unrecognized_host_warns_when_lenient() {
        let (_, warning) = resolve("windows", PlatformPolicy::Lenient).unwrap();
        assert!(matches!(warning, Some(Warning::PlatformUnrecognized { .. })));

        let (_, warning) = resolve("macos", PlatformPolicy::Lenient).unwrap();
        assert!(warning.is_none());
    }

    #[test]
    fn unrecognized_host_fails_when_strict() {
        let err = resolve("windows", PlatformPolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::PlatformUnsupported { os } if os == "windows"));
    }

    #[test]
    fn naming_convention() {
        assert_eq!(PlatformClass::LinuxX86_64.library_file_name("einvoice"), "libeinvoice.so");
        assert_eq!(PlatformClass::DarwinAarch64.library_file_name("einvoice"), "libeinvoice.dylib");
        assert_eq!("linux-x86-64".parse::<PlatformClass>().unwrap(), PlatformClass::LinuxX86_64);
        assert!("windows-x86-64".parse::<PlatformClass>().is_err());
    }
}
