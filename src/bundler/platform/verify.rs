//! Native binary format checks.
//!
//! Catches a binary built for one platform class being staged under another,
//! e.g. an ELF shared object that was renamed to `.dylib`.

use super::PlatformClass;

/// Result of inspecting a native binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BinaryCheck {
    /// Format and architecture agree with the platform class.
    Matches,
    /// Parsed, but built for something else.
    Mismatch(String),
    /// Not a recognizable object file; staged as-is.
    Unrecognized,
}

/// Inspects `bytes` with goblin and compares against `class`.
pub fn check_binary(bytes: &[u8], class: PlatformClass) -> BinaryCheck {
    let object = match goblin::Object::parse(bytes) {
        Ok(object) => object,
        Err(e) => {
            log::debug!("native binary not parseable as an object file: {}", e);
            return BinaryCheck::Unrecognized;
        }
    };

    match (object, class) {
        (goblin::Object::Elf(elf), PlatformClass::LinuxX86_64) => {
            if elf.header.e_machine == goblin::elf::header::EM_X86_64 {
                BinaryCheck::Matches
            } else {
                BinaryCheck::Mismatch(format!(
                    "ELF machine {}",
                    goblin::elf::header::machine_to_str(elf.header.e_machine)
                ))
            }
        }
        (goblin::Object::Mach(goblin::mach::Mach::Binary(macho)), PlatformClass::DarwinAarch64) => {
            if macho.header.cputype == goblin::mach::cputype::CPU_TYPE_ARM64 {
                BinaryCheck::Matches
            } else {
                BinaryCheck::Mismatch(format!("Mach-O cputype {:#x}", macho.header.cputype))
            }
        }
        // Universal binaries carry an arm64 slice in practice
        (goblin::Object::Mach(goblin::mach::Mach::Fat(_)), PlatformClass::DarwinAarch64) => {
            BinaryCheck::Matches
        }
        (goblin::Object::Elf(_), _) => BinaryCheck::Mismatch("ELF object".to_string()),
        (goblin::Object::Mach(_), _) => BinaryCheck::Mismatch("Mach-O object".to_string()),
        (goblin::Object::PE(_), _) => BinaryCheck::Mismatch("PE object".to_string()),
        _ => BinaryCheck::Unrecognized,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal 64-bit little-endian ELF header for x86-64.
    pub(crate) fn elf_x86_64_stub() -> Vec<u8> {
        let mut header = vec![0u8; 64];
        header[..4].copy_from_slice(b"\x7fELF");
        header[4] = 2; // ELFCLASS64
        header[5] = 1; // little endian
        header[6] = 1; // EV_CURRENT
        header[16] = 3; // ET_DYN
        header[18] = 62; // EM_X86_64
        header[20] = 1;
        header[52] = 64; // e_ehsize
        header
    }

    #[test]
    fn arbitrary_bytes_are_unrecognized() {
        assert_eq!(
            check_binary(b"not a shared object", PlatformClass::LinuxX86_64),
            BinaryCheck::Unrecognized
        );
    }

    #[test]
    fn elf_header_under_darwin_is_mismatch() {
        assert_eq!(
            check_binary(&elf_x86_64_stub(), PlatformClass::DarwinAarch64),
            BinaryCheck::Mismatch("ELF object".to_string())
        );
    }

    #[test]
    fn elf_header_under_linux_matches() {
        assert_eq!(
            check_binary(&elf_x86_64_stub(), PlatformClass::LinuxX86_64),
            BinaryCheck::Matches
        );
    }
}
