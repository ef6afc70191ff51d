//! Service-registration files (`META-INF/services/<interface>`).
//!
//! Each file lists implementation classes by fully-qualified name. Several
//! bundled components may register providers for the same interface, so files
//! with the same name are merged as ordered sets instead of overwriting each
//! other.

use super::Relocator;
use std::collections::{BTreeMap, HashSet};

/// Directory holding service-registration files inside a jar.
pub const SERVICES_DIR: &str = "META-INF/services/";

/// Returns the interface name if `entry` is a service-registration file.
pub fn service_name(entry: &str) -> Option<&str> {
    entry
        .strip_prefix(SERVICES_DIR)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

/// Ordered, duplicate-free list of provider class names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceFile {
    entries: Vec<String>,
}

impl ServiceFile {
    /// Parses a service file, dropping comments and blank lines.
    pub fn parse(contents: &str) -> Self {
        let mut file = Self::default();
        for line in contents.lines() {
            let entry = line.split('#').next().unwrap_or_default().trim();
            if !entry.is_empty() {
                file.push(entry.to_string());
            }
        }
        file
    }

    /// Appends `entry` unless already present.
    pub fn push(&mut self, entry: String) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Union with `other`, keeping first-seen order.
    pub fn merge(&mut self, other: ServiceFile) {
        for entry in other.entries {
            self.push(entry);
        }
    }

    /// Provider names in order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Rewrites every entry; entries that collapse onto the same name are
    /// deduplicated.
    pub fn relocate(self, relocator: &mut Relocator) -> Self {
        let mut seen = HashSet::new();
        let entries = self
            .entries
            .into_iter()
            .map(|entry| relocator.rewrite_str(&entry))
            .filter(|entry| seen.insert(entry.clone()))
            .collect();
        Self { entries }
    }

    /// Serialized form, one entry per line.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out.into_bytes()
    }
}

/// Collects service files from every input, keyed by interface name.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    files: BTreeMap<String, ServiceFile>,
}

impl ServiceRegistry {
    /// Merges one contributed file into the registry.
    pub fn add(&mut self, name: &str, contents: &[u8]) {
        let parsed = ServiceFile::parse(&String::from_utf8_lossy(contents));
        self.files.entry(name.to_string()).or_default().merge(parsed);
    }

    /// Number of distinct service files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no service file was contributed.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Relocates names and entries and returns `(entry path, contents)` pairs.
    ///
    /// Files whose interface names collapse onto the same relocated name are
    /// merged again after relocation.
    pub fn into_entries(self, relocator: &mut Relocator) -> Vec<(String, Vec<u8>)> {
        let mut relocated: BTreeMap<String, ServiceFile> = BTreeMap::new();
        for (name, file) in self.files {
            let new_name = relocator.rewrite_str(&name);
            let file = file.relocate(relocator);
            relocated.entry(new_name).or_default().merge(file);
        }
        relocated
            .into_iter()
            .map(|(name, file)| (format!("{SERVICES_DIR}{name}"), file.to_bytes()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::relocate::RelocationRule;

    #[test]
    fn recognizes_service_entries() {
        assert_eq!(
            service_name("META-INF/services/kotlinx.coroutines.CoroutineExceptionHandler"),
            Some("kotlinx.coroutines.CoroutineExceptionHandler")
        );
        assert_eq!(service_name("META-INF/services/"), None);
        assert_eq!(service_name("META-INF/MANIFEST.MF"), None);
    }

    #[test]
    fn parse_skips_comments_and_duplicates() {
        let file = ServiceFile::parse("# providers\na.B\n\n a.C # trailing\na.B\n");
        assert_eq!(file.entries(), ["a.B", "a.C"]);
    }

    #[test]
    fn disjoint_files_merge_into_relocated_union() {
        let mut registry = ServiceRegistry::default();
        let name = "kotlinx.coroutines.internal.MainDispatcherFactory";
        registry.add(name, b"kotlinx.coroutines.android.AndroidDispatcherFactory\n");
        registry.add(
            name,
            b"kotlinx.coroutines.swing.SwingDispatcherFactory\nkotlinx.coroutines.android.AndroidDispatcherFactory\n",
        );

        let mut relocator = Relocator::new(&[RelocationRule::new(
            "kotlinx.coroutines",
            "com.example.coroutines",
        )
        .unwrap()]);
        let entries = registry.into_entries(&mut relocator);

        assert_eq!(entries.len(), 1);
        let (path, contents) = &entries[0];
        assert_eq!(
            path,
            "META-INF/services/com.example.coroutines.internal.MainDispatcherFactory"
        );
        assert_eq!(
            String::from_utf8_lossy(contents),
            "com.example.coroutines.android.AndroidDispatcherFactory\n\
             com.example.coroutines.swing.SwingDispatcherFactory\n"
        );
    }
}
