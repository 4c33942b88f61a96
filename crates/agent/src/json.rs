//! Lenient JSON decoding for gateway and model output.

use serde::de::DeserializeOwned;

/// Locate the first JSON object in `response`, tolerating code fences and
/// prose around it.
pub fn extract_json_object(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let json_start = start + 7;
        if let Some(end) = response[json_start..].find("```") {
            let candidate = response[json_start..json_start + end].trim();
            if candidate.starts_with('{') {
                return balanced_object(candidate);
            }
        }
    }

    let start = response.find('{')?;
    balanced_object(&response[start..])
}

/// Returns the prefix of `candidate` (which must start with `{`) up to the
/// matching closing brace.
fn balanced_object(candidate: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (index, ch) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse `body` as `T`, falling back to the first balanced object inside it.
pub fn parse_lenient<T>(body: &str) -> Result<T, String>
where
    T: DeserializeOwned,
{
    match serde_json::from_str::<T>(body.trim()) {
        Ok(value) => Ok(value),
        Err(direct_error) => {
            let Some(object) = extract_json_object(body) else {
                return Err(format!("no JSON object found ({direct_error})"));
            };
            serde_json::from_str::<T>(object).map_err(|error| error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::{extract_json_object, parse_lenient};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Summary {
        summary: String,
    }

    #[test]
    fn extracts_object_from_markdown_fence() {
        let response = "Here you go:\n```json\n{\"summary\": \"ok\"}\n```\nThanks";
        assert_eq!(extract_json_object(response), Some("{\"summary\": \"ok\"}"));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let response = r#"noise {"summary": "uses } and { freely", "n": {"x": 1}} trailing }"#;
        assert_eq!(
            extract_json_object(response),
            Some(r#"{"summary": "uses } and { freely", "n": {"x": 1}}"#)
        );
    }

    #[test]
    fn truncated_object_yields_none() {
        assert_eq!(extract_json_object(r#"{"summary": "cut off"#), None);
    }

    #[test]
    fn parse_lenient_recovers_from_trailing_garbage() {
        let parsed: Summary =
            parse_lenient("{\"summary\":\"Fintech focus\"}\n<!-- proxy footer -->").expect("parse");
        assert_eq!(parsed, Summary { summary: "Fintech focus".to_string() });
    }

    #[test]
    fn parse_lenient_reports_missing_object() {
        let error = parse_lenient::<Summary>("<html>502 Bad Gateway</html>").expect_err("no json");
        assert!(error.contains("no JSON object found"));
    }
}
