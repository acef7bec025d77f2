//! Detection-driven tool catalog
//!
//! Turns the `[tools.*]` config tables into tool definitions. An entry that
//! names a `binary` is only offered when that binary resolves on `PATH`, so
//! the catalog reflects what is actually installed on this host.

use std::collections::BTreeMap;

use argos_domain::tool::entities::ToolDefinition;
use tracing::{debug, info, warn};

use crate::config::FileToolConfig;

/// Why a configured tool was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    BinaryNotFound(String),
    Invalid(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BinaryNotFound(binary) => write!(f, "binary '{}' not found on PATH", binary),
            SkipReason::Invalid(reason) => write!(f, "{}", reason),
        }
    }
}

/// Outcome of building the catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub available: Vec<ToolDefinition>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Build the catalog, checking binaries with `which`
pub fn build_catalog(tools: &BTreeMap<String, FileToolConfig>) -> Catalog {
    build_catalog_with(tools, |binary| which::which(binary).is_ok())
}

/// Build the catalog with a custom binary check
pub fn build_catalog_with<F>(tools: &BTreeMap<String, FileToolConfig>, is_installed: F) -> Catalog
where
    F: Fn(&str) -> bool,
{
    let mut catalog = Catalog::default();

    for (name, entry) in tools {
        let definition = entry.to_definition(name);
        if let Err(e) = definition.validate() {
            warn!(tool = %name, error = %e, "Skipping invalid tool definition");
            catalog.skipped.push((name.clone(), SkipReason::Invalid(e.to_string())));
            continue;
        }
        if let Some(binary) = &entry.binary
            && !is_installed(binary)
        {
            debug!(tool = %name, binary = %binary, "Tool binary not installed");
            catalog
                .skipped
                .push((name.clone(), SkipReason::BinaryNotFound(binary.clone())));
            continue;
        }
        catalog.available.push(definition);
    }

    info!(
        available = catalog.available.len(),
        skipped = catalog.skipped.len(),
        "Tool catalog built"
    );
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;

    const TOOLS: &str = r#"
        [tools."spectrum.sweep"]
        namespace = "spectrum"
        binary = "hackrf_sweep"
        transport = { type = "process", command = "hackrf_sweep" }

        [tools."wifi.status"]
        namespace = "wifi"
        transport = { type = "http", base_url = "http://localhost:2501", path = "/system/status.json" }

        [tools."gps.fix"]
        namespace = "gps"
        binary = "gpspipe"
        transport = { type = "process", command = "gpspipe", args = ["-w", "-n", "5"] }

        [tools."broken"]
        namespace = "misc"
        transport = { type = "socket", address = "" }
    "#;

    fn tools() -> BTreeMap<String, FileToolConfig> {
        toml::from_str::<FileConfig>(TOOLS).unwrap().tools
    }

    #[test]
    fn test_tools_without_installed_binary_are_skipped() {
        let catalog = build_catalog_with(&tools(), |binary| binary == "gpspipe");

        let names: Vec<&str> = catalog.available.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["gps.fix", "wifi.status"]);
        assert!(catalog.skipped.contains(&(
            "spectrum.sweep".to_string(),
            SkipReason::BinaryNotFound("hackrf_sweep".to_string())
        )));
    }

    #[test]
    fn test_invalid_definitions_are_reported() {
        let catalog = build_catalog_with(&tools(), |_| true);

        let (name, reason) = catalog
            .skipped
            .iter()
            .find(|(name, _)| name == "broken")
            .unwrap();
        assert_eq!(name, "broken");
        assert!(matches!(reason, SkipReason::Invalid(_)));
        assert_eq!(catalog.available.len(), 3);
    }

    #[test]
    fn test_which_finds_shell() {
        let mut tools = BTreeMap::new();
        let entry: FileToolConfig = toml::from_str(
            r#"
            namespace = "sys"
            binary = "sh"
            transport = { type = "process", command = "sh" }
            "#,
        )
        .unwrap();
        tools.insert("sys.shell".to_string(), entry);

        let catalog = build_catalog(&tools);
        assert_eq!(catalog.available.len(), 1);
    }
}
