//! Macro extraction from the generator's dump output.
//!
//! The dump backend writes the fully resolved build description, after
//! includes, conditions, and variables have been applied:
//!
//! ```text
//! {'targets': [{'target_name': 'libtgvoip',
//!               'configurations': {'Release': {'defines': ['HAVE_X', 'VER=2'],
//!                                              'libraries': ['ssl']}},
//!               'libraries': ['-lpthread']}]}
//! ```
//!
//! It is the only place the per-configuration define table is exposed in a
//! stable form, so it is the single source of truth for the macros the
//! compiler saw.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::builder::literal;
use crate::core::error::PipelineError;
use crate::core::macros::{Define, MacroSet};

/// Top level of a dump file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DumpFile {
    #[serde(default)]
    pub targets: Vec<DumpTarget>,
}

/// One resolved target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DumpTarget {
    pub target_name: String,

    #[serde(default)]
    pub configurations: BTreeMap<String, DumpConfiguration>,

    /// Link libraries shared by every configuration
    #[serde(default)]
    pub libraries: Vec<String>,
}

/// One configuration of a target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DumpConfiguration {
    #[serde(default)]
    pub defines: Vec<String>,

    #[serde(default)]
    pub libraries: Vec<String>,
}

/// What the compiler used for one target configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub macros: MacroSet,
    /// Configuration libraries first, then target libraries, without duplicates
    pub libraries: Vec<String>,
}

impl DumpFile {
    /// Read and parse a dump file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read build description dump: {}", path.display()))?;

        Self::parse(&content).map_err(|e| {
            PipelineError::BuildGraphGeneration {
                target: path.display().to_string(),
                message: format!("malformed build description dump: {:#}", e),
            }
            .into()
        })
    }

    /// Parse dump content.
    pub fn parse(content: &str) -> Result<Self> {
        let value = literal::parse(content)?;
        serde_json::from_value(value).context("unexpected build description layout")
    }

    pub fn target(&self, name: &str) -> Option<&DumpTarget> {
        self.targets.iter().find(|t| t.target_name == name)
    }

    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.target_name.clone()).collect()
    }
}

impl DumpTarget {
    /// Macros and extra libraries of one configuration.
    pub fn extract(&self, configuration: &str) -> Option<Extracted> {
        let config = self.configurations.get(configuration)?;

        let mut macros = MacroSet::new();
        for token in &config.defines {
            let define = Define::parse(token);
            // Empty tokens occur when a define list is built from a blank variable.
            if !define.name.is_empty() {
                macros.define(define);
            }
        }

        // Entries are link names; the generator also accepts `-l` flags.
        let mut libraries: Vec<String> = Vec::new();
        for lib in config.libraries.iter().chain(&self.libraries) {
            let name = lib.strip_prefix("-l").unwrap_or(lib).trim();
            if !name.is_empty() && !libraries.iter().any(|l| l == name) {
                libraries.push(name.to_string());
            }
        }

        Some(Extracted { macros, libraries })
    }
}

/// Extract the macros and extra libraries of `target` in `configuration`.
///
/// A missing target or configuration is an error, never an empty set.
pub fn extract(dump_path: &Path, target: &str, configuration: &str) -> Result<Extracted> {
    let dump = DumpFile::load(dump_path)?;
    extract_from(&dump, dump_path, target, configuration)
}

/// [`extract`] on an already parsed dump.
pub fn extract_from(
    dump: &DumpFile,
    dump_path: &Path,
    target: &str,
    configuration: &str,
) -> Result<Extracted> {
    let not_found = |available: Vec<String>| PipelineError::ConfigurationNotFound {
        dump: dump_path.to_path_buf(),
        target: target.to_string(),
        configuration: configuration.to_string(),
        available,
    };

    let Some(found) = dump.target(target) else {
        let available = dump
            .target_names()
            .into_iter()
            .map(|name| format!("target `{}`", name))
            .collect();
        return Err(not_found(available).into());
    };

    let extracted = found
        .extract(configuration)
        .ok_or_else(|| not_found(found.configurations.keys().cloned().collect()))?;

    tracing::debug!(
        "Extracted {} macros and {} libraries from {} ({})",
        extracted.macros.len(),
        extracted.libraries.len(),
        target,
        configuration
    );

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::variant::BuildVariant;
    use crate::test_support::fixtures::{write_dump, SAMPLE_DUMP, TWO_CONFIG_DUMP};
    use tempfile::TempDir;

    #[test]
    fn test_extract_release() {
        let tmp = TempDir::new().unwrap();
        let path = write_dump(tmp.path(), SAMPLE_DUMP);

        let extracted = extract(&path, "libtgvoip", "Release").unwrap();
        assert_eq!(
            extracted.macros.pairs(),
            vec![("HAVE_X", None), ("VER", Some("2"))]
        );
        assert_eq!(extracted.libraries, vec!["ssl"]);
    }

    #[test]
    fn test_extract_debug_configuration() {
        let tmp = TempDir::new().unwrap();
        let path = write_dump(tmp.path(), TWO_CONFIG_DUMP);

        let configuration = BuildVariant::DebugSymbols.configuration_name();
        let extracted = extract(&path, "libtgvoip", configuration).unwrap();
        assert_eq!(
            extracted.macros.pairs(),
            vec![
                ("TGVOIP_USE_CALLBACK_AUDIO_IO", None),
                ("WEBRTC_APM_DEBUG_DUMP", Some("0")),
                ("_DEBUG", None),
            ]
        );
        assert!(!extracted.macros.contains("NDEBUG"));
        assert_eq!(extracted.libraries, vec!["ssl", "crypto", "pthread"]);
    }

    #[test]
    fn test_missing_configuration() {
        let tmp = TempDir::new().unwrap();
        let path = write_dump(tmp.path(), SAMPLE_DUMP);

        let err = extract(&path, "libtgvoip", "Debug").unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::ConfigurationNotFound {
                configuration,
                available,
                ..
            }) => {
                assert_eq!(configuration, "Debug");
                assert_eq!(available, &vec!["Release".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_target() {
        let tmp = TempDir::new().unwrap();
        let path = write_dump(tmp.path(), SAMPLE_DUMP);

        let err = extract(&path, "opus", "Release").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ConfigurationNotFound { .. })
        ));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let dump = DumpFile::parse(SAMPLE_DUMP).unwrap();
        let path = Path::new("sample.gypd");
        let a = extract_from(&dump, path, "libtgvoip", "Release").unwrap();
        let b = extract_from(&dump, path, "libtgvoip", "Release").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_define_splitting_and_library_order() {
        let dump = DumpFile::parse(
            r#"{'targets': [{'target_name': 't',
                'libraries': ['-lpthread', 'ssl', 'pthread'],
                'configurations': {'Debug': {
                    'defines': ['URL=http://x?a=b', ' SPACED = 1 ', 'FLAG', '', 'FLAG=2'],
                    'libraries': ['ssl', 'crypto']}}}]}"#,
        )
        .unwrap();

        let extracted = dump.target("t").unwrap().extract("Debug").unwrap();
        assert_eq!(
            extracted.macros.pairs(),
            vec![
                ("URL", Some("http://x?a=b")),
                ("SPACED", Some("1")),
                ("FLAG", Some("2")),
            ]
        );
        assert_eq!(extracted.libraries, vec!["ssl", "crypto", "pthread"]);
    }

    #[test]
    fn test_macro_flags_round_trip() {
        let mut macros = MacroSet::new();
        macros.define(Define::flag("HAVE_X"));
        macros.define(Define::key_value("VER", "2"));
        macros.define(Define::key_value("PATH_SEP", "a=b"));

        let defines: Vec<String> = macros
            .to_flags()
            .iter()
            .map(|f| format!("'{}'", f.trim_start_matches("-D")))
            .collect();
        let src = format!(
            "{{'targets': [{{'target_name': 't', 'configurations': {{'Release': {{'defines': [{}]}}}}}}]}}",
            defines.join(", ")
        );

        let dump = DumpFile::parse(&src).unwrap();
        let extracted = dump.target("t").unwrap().extract("Release").unwrap();
        assert_eq!(extracted.macros, macros);
    }

    #[test]
    fn test_malformed_dump_is_generation_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_dump(tmp.path(), "{'targets': [");

        let err = extract(&path, "libtgvoip", "Release").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::BuildGraphGeneration { .. })
        ));
    }
}
