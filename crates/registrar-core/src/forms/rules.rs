//! Per-field validation rules.

/// A constraint on one field's text value.
///
/// Every rule except [`Rule::Required`] passes on an empty value, so an
/// optional field only has to satisfy its rules once something is typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    OneOf(Vec<String>),
    Numeric,
    Email,
    Min(f64),
    Max(f64),
}

impl Rule {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Check `value`, returning the message to show inline when it fails.
    pub fn check(&self, label: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return match self {
                Rule::Required => Some(format!("{} is required", label)),
                _ => None,
            };
        }

        match self {
            Rule::Required => None,
            Rule::MinLength(min) if value.chars().count() < *min => {
                Some(format!("{} must be at least {} characters", label, min))
            }
            Rule::MaxLength(max) if value.chars().count() > *max => {
                Some(format!("{} must be at most {} characters", label, max))
            }
            Rule::OneOf(allowed) if !allowed.iter().any(|a| a == value) => {
                Some(format!("{} must be one of: {}", label, allowed.join(", ")))
            }
            Rule::Numeric if parse_number(value).is_none() => {
                Some(format!("{} must be a number", label))
            }
            Rule::Email if !looks_like_email(value) => {
                Some(format!("{} must be a valid email address", label))
            }
            Rule::Min(min) => match parse_number(value) {
                Some(n) if n < *min => Some(format!("{} must be at least {}", label, min)),
                Some(_) => None,
                None => Some(format!("{} must be a number", label)),
            },
            Rule::Max(max) => match parse_number(value) {
                Some(n) if n > *max => Some(format!("{} must be at most {}", label, max)),
                Some(_) => None,
                None => Some(format!("{} must be a number", label)),
            },
            _ => None,
        }
    }
}

/// A finite number; `inf` and `NaN` parse as `f64` but are not accepted.
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(
            Rule::Required.check("Title", "  "),
            Some("Title is required".to_string())
        );
        assert_eq!(Rule::Required.check("Title", "T"), None);
    }

    #[test]
    fn test_optional_rules_skip_empty() {
        assert_eq!(Rule::MinLength(6).check("Password", ""), None);
        assert_eq!(Rule::Email.check("Email", ""), None);
        assert_eq!(Rule::Min(1.0).check("Credits", ""), None);
    }

    #[test]
    fn test_lengths_count_chars() {
        assert!(Rule::MinLength(6).check("Password", "abc").is_some());
        assert!(Rule::MinLength(3).check("Name", "Zoë").is_none());
        assert!(Rule::MaxLength(2).check("Code", "abc").is_some());
    }

    #[test]
    fn test_one_of() {
        let rule = Rule::one_of(["Autumn", "Summer", "Fall"]);
        assert!(rule.check("Name", "Fall").is_none());
        assert_eq!(
            rule.check("Name", "Winter"),
            Some("Name must be one of: Autumn, Summer, Fall".to_string())
        );
    }

    #[test]
    fn test_numeric_bounds() {
        assert!(Rule::Numeric.check("Credits", "3").is_none());
        assert!(Rule::Numeric.check("Credits", "three").is_some());
        assert!(Rule::Numeric.check("Credits", "inf").is_some());
        assert!(Rule::Numeric.check("Credits", "NaN").is_some());
        assert!(Rule::Max(100.0).check("Marks", "-infinity").is_some());
        assert!(Rule::Min(0.0).check("Marks", "-1").is_some());
        assert!(Rule::Max(100.0).check("Marks", "100").is_none());
        assert!(Rule::Max(100.0).check("Marks", "101").is_some());
    }

    #[test]
    fn test_email() {
        assert!(Rule::Email.check("Email", "a@b.edu").is_none());
        assert!(Rule::Email.check("Email", "a@b").is_some());
        assert!(Rule::Email.check("Email", "@b.edu").is_some());
        assert!(Rule::Email.check("Email", "a b@c.edu").is_some());
    }
}
