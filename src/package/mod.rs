pub mod acquire;
pub mod downloader;
pub mod index;
pub mod store;

pub use acquire::{AcquisitionReport, PackageAcquirer};
pub use downloader::{DownloadOutcome, Downloader};
pub use index::PackageIndexClient;
pub use store::PackageStore;

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A routable translation direction, as encoded in a package filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguagePair {
    pub input: String,
    pub output: String,
}

impl LanguagePair {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.input, self.output)
    }
}

/// One entry of the remote package index. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageDescriptor {
    pub code: String,
    pub package_version: String,
}

impl PackageDescriptor {
    pub fn filename(&self, extension: &str) -> String {
        generate_filename(&self.code, &self.package_version, extension)
    }
}

pub fn generate_filename(code: &str, package_version: &str, extension: &str) -> String {
    format!("{}-{}.{}", code, normalize_version(package_version), extension)
}

pub fn normalize_version(version: &str) -> String {
    version.replace('.', "_")
}

/// One `en→(de, sk)` group per input language, in code order.
pub fn pair_groups(pairs: &BTreeSet<LanguagePair>) -> Vec<String> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for pair in pairs {
        grouped
            .entry(pair.input.as_str())
            .or_default()
            .push(pair.output.as_str());
    }

    grouped
        .into_iter()
        .map(|(input, outputs)| format!("{}→({})", input, outputs.join(", ")))
        .collect()
}

/// Renders pairs grouped by input language, e.g. `de→(en), en→(de, sk)`.
pub fn format_pairs(pairs: &BTreeSet<LanguagePair>) -> String {
    if pairs.is_empty() {
        return "none".to_string();
    }
    pair_groups(pairs).join(", ")
}

/// Every language code that appears on either side of a pair.
pub fn language_codes(pairs: &BTreeSet<LanguagePair>) -> BTreeSet<String> {
    pairs
        .iter()
        .flat_map(|pair| [pair.input.clone(), pair.output.clone()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_normalizes_version_dots() {
        assert_eq!(
            generate_filename("en_sk", "1.9", "argosmodel"),
            "en_sk-1_9.argosmodel"
        );
        let descriptor = PackageDescriptor {
            code: "translate-de_en".to_string(),
            package_version: "1.0.2".to_string(),
        };
        assert_eq!(
            descriptor.filename("argosmodel"),
            "translate-de_en-1_0_2.argosmodel"
        );
    }

    #[test]
    fn pairs_are_grouped_by_input() {
        let pairs: BTreeSet<_> = [
            LanguagePair::new("en", "sk"),
            LanguagePair::new("en", "de"),
            LanguagePair::new("de", "en"),
        ]
        .into_iter()
        .collect();

        assert_eq!(format_pairs(&pairs), "de→(en), en→(de, sk)");
        assert_eq!(pair_groups(&pairs), vec!["de→(en)", "en→(de, sk)"]);
        assert_eq!(
            language_codes(&pairs).into_iter().collect::<Vec<_>>(),
            vec!["de", "en", "sk"]
        );
    }

    #[test]
    fn empty_pairs_render_as_none() {
        assert_eq!(format_pairs(&BTreeSet::new()), "none");
        assert!(pair_groups(&BTreeSet::new()).is_empty());
    }
}
