//! Placeholder substitution for transport templates
//!
//! Process arguments use `{{name}}`, HTTP paths use `{name}`. Placeholders
//! without a matching parameter are left as they are.

use super::entities::Parameters;
use serde_json::Value;

/// Render a parameter value the way it should appear on a command line or URL
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace `{{name}}` in every argument
pub fn render_args(args: &[String], params: &Parameters) -> Vec<String> {
    args.iter()
        .map(|arg| {
            params.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{{{}}}}}", name), &stringify(value))
            })
        })
        .collect()
}

/// Replace `{name}` in a path, returning the path and the names consumed
pub fn render_path(path: &str, params: &Parameters) -> (String, Vec<String>) {
    let mut rendered = path.to_string();
    let mut consumed = Vec::new();
    for (name, value) in params {
        let placeholder = format!("{{{}}}", name);
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, &stringify(value));
            consumed.push(name.clone());
        }
    }
    (rendered, consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_render_args_replaces_placeholders() {
        let args = vec!["--device".to_string(), "{{id}}".to_string()];
        let rendered = render_args(&args, &params(json!({"id": "X1"})));
        assert_eq!(rendered, vec!["--device", "X1"]);
    }

    #[test]
    fn test_render_args_inline_and_numbers() {
        let args = vec!["-f{{start}}:{{end}}".to_string(), "{{missing}}".to_string()];
        let rendered = render_args(&args, &params(json!({"start": 2400, "end": 2500})));
        assert_eq!(rendered, vec!["-f2400:2500", "{{missing}}"]);
    }

    #[test]
    fn test_render_path_tracks_consumed() {
        let (path, mut consumed) = render_path(
            "/devices/{id}/channels/{channel}",
            &params(json!({"id": "wlan1", "channel": 6, "verbose": true})),
        );
        assert_eq!(path, "/devices/wlan1/channels/6");
        consumed.sort();
        assert_eq!(consumed, vec!["channel", "id"]);
    }

    #[test]
    fn test_render_path_untouched_without_placeholders() {
        let (path, consumed) = render_path("/status", &params(json!({"q": "x"})));
        assert_eq!(path, "/status");
        assert!(consumed.is_empty());
    }
}
