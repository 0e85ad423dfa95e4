use std::str::FromStr;

use anyhow::{Context, Result};

/// Load an environment variable and parse it to the given type
///
/// # Errors
///
/// Returns an error if the environment variable is not set or is not a valid value for the given type
pub fn load_env_var<T: FromStr>(var_name: &str) -> Result<T> {
    let var = std::env::var(var_name).context(format!("{} is not set", var_name))?;
    parse_env_value(var_name, &var)
}

/// Load an environment variable, falling back to `default` when it is unset or empty
///
/// # Errors
///
/// Returns an error if the variable is set but is not a valid value for the given type
pub fn load_env_var_or<T: FromStr>(var_name: &str, default: T) -> Result<T> {
    Ok(load_optional_env_var(var_name)?.unwrap_or(default))
}

/// Load an environment variable that may be left out entirely
pub fn load_optional_env_var<T: FromStr>(var_name: &str) -> Result<Option<T>> {
    match std::env::var(var_name) {
        Ok(var) if !var.trim().is_empty() => parse_env_value(var_name, &var).map(Some),
        _ => Ok(None),
    }
}

fn parse_env_value<T: FromStr>(var_name: &str, var: &str) -> Result<T> {
    var.trim()
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("{} is not a valid {}", var_name, var))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_env_var_or_uses_default_when_unset() {
        let value: u64 = load_env_var_or("LENDING_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_load_env_var_rejects_invalid_value() {
        std::env::set_var("LENDING_TEST_INVALID_NUMBER", "not-a-number");
        let result: Result<u64> = load_env_var("LENDING_TEST_INVALID_NUMBER");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_optional_env_var_treats_blank_as_missing() {
        std::env::set_var("LENDING_TEST_BLANK_VALUE", "  ");
        let value: Option<u64> = load_optional_env_var("LENDING_TEST_BLANK_VALUE").unwrap();
        assert_eq!(value, None);
    }
}
