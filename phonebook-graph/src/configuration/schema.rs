//! Configuration schema generation and validation

use std::fmt::Write;
use std::sync::OnceLock;

use jsonschema::ValidationError;
use jsonschema::Validator;
use jsonschema::error::ValidationErrorKind;
use schemars::Schema;
use schemars::generate::SchemaSettings;

use super::Configuration;
use super::ConfigurationError;
use super::expansion::Expansion;

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> Schema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = false;
    });

    let generator = settings.into_generator();
    generator.into_root_schema_for::<Configuration>()
}

/// Validate config yaml against the generated json schema.
///
/// The validation sequence is:
/// 1. Parse the config into yaml
/// 2. Expand env variables
/// 3. Validate the expanded yaml against the json schema, reporting every error with its path
/// 4. Deserialize, then check the rules the schema cannot express
pub(crate) fn validate_yaml_configuration(
    raw_yaml: &str,
    expansion: Expansion,
) -> Result<Configuration, ConfigurationError> {
    // A file holding nothing but comments is not a yaml document for serde_yaml
    let defaulted_yaml = if has_content(raw_yaml) {
        raw_yaml
    } else {
        "{}"
    };

    let yaml: serde_json::Value = serde_yaml::from_str(defaulted_yaml).map_err(|e| {
        ConfigurationError::InvalidConfiguration {
            message: "failed to parse yaml",
            error: e.to_string(),
        }
    })?;
    let yaml = if yaml.is_null() {
        serde_json::json!({})
    } else {
        yaml
    };

    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    let validator = VALIDATOR
        .get_or_init(|| {
            let config_schema =
                serde_json::to_value(generate_config_schema()).map_err(|e| e.to_string())?;
            jsonschema::draft7::new(&config_schema).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|error| ConfigurationError::InvalidConfiguration {
            message: "failed to compile configuration schema",
            error: error.clone(),
        })?;

    let expanded_yaml = expansion.expand(&yaml)?;
    let mut errors = String::new();
    for (idx, e) in validator.iter_errors(&expanded_yaml).enumerate() {
        // The instance is left out of the message so that expanded secrets never leak
        let _ = writeln!(
            &mut errors,
            "{}. at '{}': {}",
            idx + 1,
            display_path(&e.instance_path.to_string()),
            describe(&e)
        );
    }
    if !errors.is_empty() {
        return Err(ConfigurationError::InvalidConfiguration {
            message: "configuration had errors",
            error: format!("\n{errors}"),
        });
    }

    let config: Configuration = serde_json::from_value(expanded_yaml)
        .map_err(ConfigurationError::DeserializeConfigError)?;
    config.validate()
}

fn has_content(raw_yaml: &str) -> bool {
    raw_yaml.lines().map(str::trim).any(|line| {
        !line.is_empty() && !line.starts_with('#') && line != "---" && line != "..."
    })
}

fn display_path(instance_path: &str) -> &str {
    if instance_path.is_empty() {
        "/"
    } else {
        instance_path
    }
}

fn describe(error: &ValidationError<'_>) -> String {
    match &error.kind {
        ValidationErrorKind::AdditionalProperties { unexpected } => format!(
            "unknown field{} {}",
            if unexpected.len() == 1 { "" } else { "s" },
            unexpected
                .iter()
                .map(|field| format!("'{field}'"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        ValidationErrorKind::Required { property } => match property.as_str() {
            Some(name) => format!("missing required field '{name}'"),
            None => format!("missing required field {property}"),
        },
        ValidationErrorKind::Type { .. } => "value has the wrong type".to_string(),
        // Report why the closest alternative failed rather than the alternation itself
        ValidationErrorKind::AnyOf { context } => context
            .iter()
            .flatten()
            .find(|inner| !matches!(inner.kind, ValidationErrorKind::Type { .. }))
            .map(describe)
            .unwrap_or_else(|| "value does not match any allowed shape".to_string()),
        _ => format!("value does not match the schema at '{}'", error.schema_path),
    }
}
