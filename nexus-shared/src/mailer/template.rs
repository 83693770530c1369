//! Minimal `{{name}}` HTML templates
//!
//! A template is parsed once into literal and placeholder segments.
//! Parsing fails if a required placeholder is missing or a `{{` is left
//! unclosed. Substituted values are HTML-escaped.

use std::collections::HashSet;

use super::MailerError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

impl Template {
    /// Parses `source`, requiring every name in `required` to appear
    pub fn parse(
        name: &'static str,
        source: &str,
        required: &[&str],
    ) -> Result<Self, MailerError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }

            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| MailerError::Template {
                name,
                reason: "unclosed placeholder".to_string(),
            })?;

            let key = after[..end].trim();
            if key.is_empty() {
                return Err(MailerError::Template {
                    name,
                    reason: "empty placeholder".to_string(),
                });
            }
            segments.push(Segment::Placeholder(key.to_string()));

            rest = &after[end + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        let present: HashSet<&str> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(key) => Some(key.as_str()),
                Segment::Literal(_) => None,
            })
            .collect();

        if let Some(missing) = required.iter().find(|key| !present.contains(*key)) {
            return Err(MailerError::Template {
                name,
                reason: format!("missing placeholder {{{{{}}}}}", missing),
            });
        }

        Ok(Self { name, segments })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Renders with the given values; unknown placeholders render empty
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => {
                    if let Some((_, value)) = values.iter().find(|(k, _)| k == key) {
                        out.push_str(&escape_html(value));
                    }
                }
            }
        }

        out
    }
}

/// Escapes the five HTML-significant characters
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_values() {
        let t = Template::parse("t", "<a href=\"{{url}}\">{{ label }}</a>", &["url"]).unwrap();

        let html = t.render(&[("url", "https://x.test/?a=1&b=2"), ("label", "Go")]);
        assert_eq!(html, "<a href=\"https://x.test/?a=1&amp;b=2\">Go</a>");
    }

    #[test]
    fn test_values_are_escaped() {
        let t = Template::parse("t", "<p>{{name}}</p>", &["name"]).unwrap();

        let html = t.render(&[("name", "<script>alert('x')</script>")]);
        assert_eq!(
            html,
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_missing_required_placeholder() {
        let err = Template::parse("t", "<p>{{other}}</p>", &["url"]).unwrap_err();
        assert!(err.to_string().contains("missing placeholder {{url}}"));
    }

    #[test]
    fn test_unclosed_placeholder() {
        assert!(Template::parse("t", "<p>{{url</p>", &[]).is_err());
        assert!(Template::parse("t", "<p>{{ }}</p>", &[]).is_err());
    }
}
