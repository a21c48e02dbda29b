use serde_json::Value;

/// Truncate to at most `max_len` characters, adding an ellipsis if cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an ISO timestamp or date for display.
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(day) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        day.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}

/// Text for one table cell.
///
/// Populated references render by their most readable field; a person's
/// name object renders as the full name.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => {
            if s.len() >= 10 && s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-' {
                format_date(s)
            } else {
                s.clone()
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Array(items) => items
            .iter()
            .map(cell_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => {
            if let Some(first) = map.get("firstName").and_then(Value::as_str) {
                let last = map.get("lastName").and_then(Value::as_str).unwrap_or("");
                return format!("{} {}", first, last).trim().to_string();
            }
            ["name", "title", "year", "id", "_id"]
                .iter()
                .find_map(|field| map.get(*field).filter(|v| !v.is_null()))
                .map(cell_text)
                .unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello...");
        assert_eq!(truncate("Hi", 2), "Hi");
        assert_eq!(truncate("Ünïcödé text", 6), "Ünï...");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2025-03-04T10:00:00.000Z"), "Mar 04, 2025");
        assert_eq!(format_date("2025-03-04"), "Mar 04, 2025");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!(3)), "3");
        assert_eq!(cell_text(&json!(["Sun", "Tue"])), "Sun, Tue");
        assert_eq!(
            cell_text(&json!({ "firstName": "Ada", "lastName": "Lovelace" })),
            "Ada Lovelace"
        );
        assert_eq!(
            cell_text(&json!({ "_id": "d1", "name": "Computer Science" })),
            "Computer Science"
        );
        assert_eq!(
            cell_text(&json!({ "name": { "firstName": "Ada", "lastName": "" } })),
            "Ada"
        );
        assert_eq!(cell_text(&json!("2024-01-15")), "Jan 15, 2024");
    }
}
