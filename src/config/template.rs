use crate::error::ConfigError;

use super::extensions::Variables;

/// Replaces `{NAME}` placeholders with values from `variables`. `{{` and `}}` stand for literal
/// braces. Every placeholder has to resolve to a value.
pub fn expand(template: &str, variables: &Variables) -> Result<String, ConfigError> {
    let malformed = |reason| ConfigError::MalformedTemplate {
        template: template.to_string(),
        reason,
    };

    let mut expanded = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.next_if_eq(&'{').is_some() => expanded.push('{'),
            '}' if chars.next_if_eq(&'}').is_some() => expanded.push('}'),
            '}' => return Err(malformed("unmatched '}'")),
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(malformed("unclosed placeholder")),
                        Some(c) => name.push(c),
                    }
                }
                if name.is_empty() {
                    return Err(malformed("empty placeholder"));
                }
                match variables.get(&name) {
                    Some(Some(value)) => expanded.push_str(value),
                    Some(None) => {
                        return Err(ConfigError::UnsetVariable {
                            template: template.to_string(),
                            name,
                        })
                    }
                    None => {
                        return Err(ConfigError::UndefinedVariable {
                            template: template.to_string(),
                            name,
                        })
                    }
                }
            }
            c => expanded.push(c),
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use crate::{config::extensions::Variables, error::ConfigError};

    use super::expand;

    fn variables() -> Variables {
        Variables::from([
            ("HOME".to_string(), Some("/home/me".to_string())),
            ("GITBRANCH".to_string(), None),
        ])
    }

    #[test]
    fn test_substitution() {
        assert_eq!(
            expand("{HOME}/.trckr-db.json", &variables()).unwrap(),
            "/home/me/.trckr-db.json"
        );
        assert_eq!(expand("plain", &variables()).unwrap(), "plain");
        assert_eq!(expand("", &variables()).unwrap(), "");
        assert_eq!(
            expand("{HOME}{HOME}", &variables()).unwrap(),
            "/home/me/home/me"
        );
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(
            expand("{{HOME}} is {HOME}", &variables()).unwrap(),
            "{HOME} is /home/me"
        );
    }

    #[test]
    fn test_unknown_and_unset_variables() {
        assert!(matches!(
            expand("{NOPE}", &variables()),
            Err(ConfigError::UndefinedVariable { name, .. }) if name == "NOPE"
        ));
        assert!(matches!(
            expand("{GITBRANCH}", &variables()),
            Err(ConfigError::UnsetVariable { name, .. }) if name == "GITBRANCH"
        ));
    }

    #[test]
    fn test_malformed_templates() {
        for template in ["{HOME", "HOME}", "{}", "{HO{ME}"] {
            assert!(
                matches!(
                    expand(template, &variables()),
                    Err(ConfigError::MalformedTemplate { .. })
                ),
                "{template} should be malformed"
            );
        }
    }
}
