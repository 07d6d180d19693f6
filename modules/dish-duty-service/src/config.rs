use dish_duty_types::DEFAULT_HISTORY_LIMIT;
use std::env;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub data_path: String,
    /// History window shown on the dashboard
    pub history_limit: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("DISH_DUTY_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(9104),
            data_path: lookup("DISH_DUTY_DATA_PATH").unwrap_or_else(|| "./data.json".to_string()),
            history_limit: lookup("DISH_DUTY_HISTORY_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(|_| None);
        assert_eq!(config.port, 9104);
        assert_eq!(config.data_path, "./data.json");
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("DISH_DUTY_PORT", "not-a-port"),
            ("DISH_DUTY_DATA_PATH", "/var/lib/dish-duty/data.json"),
            ("DISH_DUTY_HISTORY_LIMIT", "25"),
        ]
        .into_iter()
        .collect();
        let config = ServiceConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, 9104);
        assert_eq!(config.data_path, "/var/lib/dish-duty/data.json");
        assert_eq!(config.history_limit, 25);
    }
}
