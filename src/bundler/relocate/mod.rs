//! Namespace relocation ("shading") of bundled components.
//!
//! The [`NamespaceRelocator`] takes the project's compiled host code plus every
//! bundled third-party jar, rewrites class files, entry paths and service
//! files under the configured [`RelocationRule`]s, and produces one merged
//! entry set ready for packaging.

mod class_file;
mod rules;
mod services;

pub use class_file::relocate_class;
#[cfg(test)]
pub(crate) use class_file::tests::class_with_constants;
pub use rules::{RelocationRule, Relocator};
pub use services::{SERVICES_DIR, ServiceFile, ServiceRegistry, service_name};

use crate::bundler::{Result, Warning, error::ErrorExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Path-keyed archive contents, sorted for deterministic output.
pub type Entries = BTreeMap<String, Vec<u8>>;

/// Where a set of entries comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Compiled host code of this project. Its references are relocated but it
    /// does not count towards rule validation.
    Project,
    /// A bundled third-party component.
    Component,
}

/// Per-rule outcome of a relocation pass.
#[derive(Clone, Debug, Serialize)]
pub struct RuleReport {
    /// Original prefix
    pub from: String,
    /// Replacement prefix
    pub to: String,
    /// References rewritten inside bundled components
    pub component_matches: usize,
}

/// Summary of a relocation pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RelocationReport {
    /// One entry per configured rule, in configuration order
    pub rules: Vec<RuleReport>,
    /// Relocated service file paths in the output
    pub merged_services: Vec<String>,
    /// Component metadata entries that were not carried over
    pub dropped: Vec<String>,
    /// Entries provided by more than one input; the first was kept
    pub duplicates: Vec<String>,
}

impl RelocationReport {
    /// One [`Warning::RelocationRuleUnmatched`] per rule that rewrote nothing.
    pub fn warnings(&self) -> Vec<Warning> {
        self.rules
            .iter()
            .filter(|rule| rule.component_matches == 0)
            .map(|rule| Warning::RelocationRuleUnmatched {
                from: rule.from.clone(),
            })
            .collect()
    }
}

/// Rewrites and merges inputs under a rule set.
pub struct NamespaceRelocator {
    relocator: Relocator,
    component_hits: Vec<usize>,
    services: ServiceRegistry,
    entries: Entries,
    report: RelocationReport,
}

impl NamespaceRelocator {
    /// Creates a relocator for `rules`.
    pub fn new(rules: &[RelocationRule]) -> Self {
        Self {
            relocator: Relocator::new(rules),
            component_hits: vec![0; rules.len()],
            services: ServiceRegistry::default(),
            entries: Entries::new(),
            report: RelocationReport::default(),
        }
    }

    /// Relocates one input into the merged entry set.
    ///
    /// Inputs are added in priority order: for an entry path provided twice,
    /// the first input's copy is kept. Service files are merged instead.
    pub fn add_input(
        &mut self,
        origin: &str,
        kind: InputKind,
        entries: impl IntoIterator<Item = (String, Vec<u8>)>,
    ) -> Result<()> {
        log::debug!("Relocating {} ({:?})", origin, kind);

        for (name, bytes) in entries {
            if name.ends_with('/') {
                continue;
            }
            if let Some(service) = service_name(&name) {
                // Merged files are rewritten in `finish`; count this input's
                // matches now so they are credited to it
                self.relocator.rewrite_str(service);
                ServiceFile::parse(&String::from_utf8_lossy(&bytes)).relocate(&mut self.relocator);
                self.services.add(service, &bytes);
                continue;
            }
            if is_dropped_metadata(&name) {
                if kind == InputKind::Component {
                    log::debug!("  dropping {} from {}", name, origin);
                    self.report.dropped.push(format!("{origin}!{name}"));
                }
                continue;
            }

            let new_name = self.relocator.rewrite_str(&name);
            let new_bytes = if name.ends_with(".class") {
                relocate_class(&bytes, &mut self.relocator, &format!("{origin}!{name}"))?
                    .unwrap_or(bytes)
            } else {
                bytes
            };

            if self.entries.contains_key(&new_name) {
                log::debug!("  duplicate entry {} from {} excluded", new_name, origin);
                self.report.duplicates.push(new_name);
            } else {
                self.entries.insert(new_name, new_bytes);
            }
        }

        let hits = self.relocator.take_hits();
        if kind == InputKind::Component {
            for (total, hit) in self.component_hits.iter_mut().zip(hits) {
                *total += hit;
            }
        }
        Ok(())
    }

    /// Reads a jar from disk and adds it as a component.
    pub fn add_component_jar(&mut self, path: &Path) -> Result<()> {
        let entries = read_jar(path)?;
        self.add_input(&path.display().to_string(), InputKind::Component, entries)
    }

    /// Finishes the pass: appends merged service files and builds the report.
    ///
    /// Service files merge across all inputs; their contents are relocated
    /// after merging.
    pub fn finish(mut self) -> (Entries, RelocationReport) {
        for (path, contents) in self.services.into_entries(&mut self.relocator) {
            self.report.merged_services.push(path.clone());
            self.entries.insert(path, contents);
        }

        self.report.rules = self
            .relocator
            .rules()
            .iter()
            .zip(&self.component_hits)
            .map(|(rule, hits)| RuleReport {
                from: rule.from().to_string(),
                to: rule.to().to_string(),
                component_matches: *hits,
            })
            .collect();

        for warning in self.report.warnings() {
            log::warn!("{warning}");
        }

        (self.entries, self.report)
    }
}

/// Component metadata that must not survive repackaging.
///
/// Jar signatures are invalidated by relocation, module descriptors name the
/// original packages, and the manifest is regenerated for the package.
fn is_dropped_metadata(name: &str) -> bool {
    if name == "META-INF/MANIFEST.MF" || name.ends_with("module-info.class") {
        return true;
    }
    match name.strip_prefix("META-INF/") {
        Some(rest) if !rest.contains('/') => {
            let upper = rest.to_ascii_uppercase();
            [".SF", ".RSA", ".DSA", ".EC"]
                .iter()
                .any(|ext| upper.ends_with(ext))
        }
        _ => false,
    }
}

/// Reads every file entry of a jar into memory.
pub fn read_jar(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let file = std::fs::File::open(path).fs_context("opening bundled component", path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
        entry
            .read_to_end(&mut bytes)
            .fs_context("reading jar entry", path.join(&name))?;
        entries.push((name, bytes));
    }

    Ok(entries)
}
