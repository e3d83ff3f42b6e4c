use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::CliError;

/// Read a JSON document, reporting parse errors with the offending line and
/// a caret under the column.
pub fn load_json(path: &Path) -> Result<Value, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|err| CliError::Parse {
        path: path.to_path_buf(),
        message: parse_context(&text, &err),
    })
}

fn parse_context(text: &str, err: &serde_json::Error) -> String {
    let Some(line) = err.line().checked_sub(1).and_then(|index| text.lines().nth(index)) else {
        return err.to_string();
    };
    let caret = format!("{}^", " ".repeat(err.column().saturating_sub(1)));
    format!("{err}\n{}\n{caret}", line.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_point_at_the_column() {
        let text = "{\n  \"a\": [1, 2,,]\n}";
        let err = serde_json::from_str::<Value>(text).unwrap_err();
        let message = parse_context(text, &err);
        let lines: Vec<&str> = message.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "  \"a\": [1, 2,,]");
        assert_eq!(lines[2].find('^'), Some(err.column() - 1));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
