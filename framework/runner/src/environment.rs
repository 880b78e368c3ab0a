use std::collections::BTreeMap;

/// A snapshot of the environment variables available to a load test.
///
/// Load tests receive this explicitly rather than reading the process environment whenever they
/// need a value, so the same definition can be driven from tests with a fixed set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment. Variables that are not valid unicode are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Look up a variable which must be set to a non-empty value.
    pub fn require(&self, name: &str) -> Result<&str, MissingVariableError> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(MissingVariableError {
                name: name.to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug, PartialEq, Eq)]
#[display("Environment variable `{name}` must be set")]
pub struct MissingVariableError {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_empty() {
        let env = Environment::default()
            .with_var("DOMAIN", "example.com")
            .with_var("TOKEN", "");

        assert_eq!(Ok("example.com"), env.require("DOMAIN"));
        assert_eq!(
            "Environment variable `TOKEN` must be set",
            env.require("TOKEN").unwrap_err().to_string()
        );
        assert!(env.require("SCENARIOS").is_err());
    }

    #[test]
    fn collect_from_pairs() {
        let env: Environment = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(Some("2"), env.get("B"));
        assert_eq!(None, env.get("C"));
    }
}
