use serde_json::Value;

/// One-line human summary of a finalized tool invocation. Unknown names and
/// missing argument keys degrade to shorter strings, never errors.
pub fn summarize(name: &str, arguments: &Value) -> String {
    match name {
        "Bash" => format!("$ {}", str_arg(arguments, "command")),
        "Read" => format!("Read: {}", str_arg(arguments, "file_path")),
        "Write" => {
            let path = str_arg(arguments, "file_path");
            let lines = arguments
                .get("content")
                .and_then(|v| v.as_str())
                .map(|content| content.lines().count())
                .unwrap_or(0);
            format!("Write: {path} ({lines} lines)")
        }
        "Edit" => format!("Edit: {}", str_arg(arguments, "file_path")),
        "Grep" => {
            let pattern = str_arg(arguments, "pattern");
            match arguments.get("path").and_then(|v| v.as_str()) {
                Some(path) => format!("Grep: \"{pattern}\" in {path}"),
                None => format!("Grep: \"{pattern}\""),
            }
        }
        "Glob" => format!("Glob: {}", str_arg(arguments, "pattern")),
        _ => {
            for key in ["command", "file_path", "pattern"] {
                if let Some(value) = arguments.get(key).and_then(|v| v.as_str()) {
                    return format!("{name}: {value}");
                }
            }
            name.to_string()
        }
    }
}

fn str_arg<'a>(arguments: &'a Value, key: &str) -> &'a str {
    arguments.get(key).and_then(|v| v.as_str()).unwrap_or("")
}
