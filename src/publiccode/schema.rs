use crate::publiccode::{ValidationError, Validator};
use serde_yaml::Value;
use url::Url;

const DEVELOPMENT_STATUSES: &[&str] = &["concept", "development", "beta", "stable", "obsolete"];

const SOFTWARE_TYPES: &[&str] = &[
    "standalone/mobile",
    "standalone/iot",
    "standalone/desktop",
    "standalone/web",
    "standalone/backend",
    "standalone/other",
    "addon",
    "library",
    "configurationFiles",
];

const MAINTENANCE_TYPES: &[&str] = &["internal", "contract", "community", "none"];

/// Validator for the required subset of the publiccode.yml standard
#[derive(Debug, Default, Clone)]
pub struct PubliccodeValidator;

impl PubliccodeValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for PubliccodeValidator {
    fn parse(&self, data: &[u8], base_dir: &str) -> Result<(), ValidationError> {
        let root: Value = serde_yaml::from_slice(data)?;

        if !root.is_mapping() {
            return Err(ValidationError::Schema(vec![
                "document root must be a mapping".to_string(),
            ]));
        }

        let mut errors = Vec::new();

        match root.get("publiccodeYmlVersion") {
            Some(Value::String(s)) if !s.is_empty() => {}
            Some(Value::Number(_)) => {}
            _ => errors.push("publiccodeYmlVersion: missing".to_string()),
        }

        require_string(&root, "name", &mut errors);

        if let Some(url) = require_string(&root, "url", &mut errors) {
            if let Err(e) = Url::parse(url) {
                errors.push(format!("url: invalid URL '{}': {}", url, e));
            }
        }

        match root.get("platforms").and_then(Value::as_sequence) {
            Some(platforms) if !platforms.is_empty() => {
                if platforms.iter().any(|p| p.as_str().is_none()) {
                    errors.push("platforms: entries must be strings".to_string());
                }
            }
            _ => errors.push("platforms: must be a non-empty list".to_string()),
        }

        require_one_of(&root, &["developmentStatus"], DEVELOPMENT_STATUSES, &mut errors);
        require_one_of(&root, &["softwareType"], SOFTWARE_TYPES, &mut errors);
        require_one_of(&root, &["maintenance", "type"], MAINTENANCE_TYPES, &mut errors);

        match lookup(&root, &["legal", "license"]).and_then(Value::as_str) {
            Some(license) if !license.trim().is_empty() => {}
            _ => errors.push("legal.license: missing".to_string()),
        }

        match root.get("description").and_then(Value::as_mapping) {
            Some(languages) if !languages.is_empty() => {}
            _ => errors.push("description: at least one language is required".to_string()),
        }

        if let Some(logo) = root.get("logo") {
            match logo.as_str() {
                Some(logo) => {
                    if let Err(message) = resolve_reference(base_dir, logo) {
                        errors.push(format!("logo: {}", message));
                    }
                }
                None => errors.push("logo: must be a string".to_string()),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Schema(errors))
        }
    }
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

fn require_string<'a>(root: &'a Value, key: &str, errors: &mut Vec<String>) -> Option<&'a str> {
    match root.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Some(s),
        _ => {
            errors.push(format!("{}: missing", key));
            None
        }
    }
}

fn require_one_of(root: &Value, path: &[&str], allowed: &[&str], errors: &mut Vec<String>) {
    let field = path.join(".");
    match lookup(root, path).and_then(Value::as_str) {
        Some(value) if allowed.contains(&value) => {}
        Some(value) => errors.push(format!(
            "{}: '{}' is not one of {}",
            field,
            value,
            allowed.join(", ")
        )),
        None => errors.push(format!("{}: missing", field)),
    }
}

/// Resolves a possibly relative reference against the manifest's directory
fn resolve_reference(base_dir: &str, reference: &str) -> Result<Url, String> {
    if let Ok(absolute) = Url::parse(reference) {
        return Ok(absolute);
    }

    let base = Url::parse(base_dir)
        .map_err(|e| format!("cannot resolve '{}' against '{}': {}", reference, base_dir, e))?;

    base.join(reference)
        .map_err(|e| format!("cannot resolve '{}' against '{}': {}", reference, base_dir, e))
}
