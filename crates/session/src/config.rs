use rxoffice_auth::Role;

/// Session-layer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Where the route guard sends unauthenticated visitors.
    pub login_path: String,
    /// Role given to self-registered users when the form names none.
    pub default_signup_role: Role,
    /// Durable flag set on successful login, cleared on teardown.
    pub authenticated_flag_key: String,
    /// Durable pointer to the resolved local user.
    pub current_user_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            default_signup_role: Role::Cashier,
            authenticated_flag_key: "isAuthenticated".to_string(),
            current_user_key: "currentUserId".to_string(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `RXOFFICE_LOGIN_PATH` and `RXOFFICE_DEFAULT_ROLE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("RXOFFICE_LOGIN_PATH").filter(|p| !p.trim().is_empty()) {
            config.login_path = path.trim().to_string();
        }

        if let Some(raw) = lookup("RXOFFICE_DEFAULT_ROLE") {
            match raw.parse::<Role>() {
                Ok(role) => config.default_signup_role = role,
                Err(e) => tracing::warn!(error = %e, "ignoring RXOFFICE_DEFAULT_ROLE"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(SessionConfig::from_lookup(lookup(&[])), SessionConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("RXOFFICE_LOGIN_PATH", "/signin"),
            ("RXOFFICE_DEFAULT_ROLE", "pharmacy_technician"),
        ]));
        assert_eq!(config.login_path, "/signin");
        assert_eq!(config.default_signup_role, Role::PharmacyTechnician);
    }

    #[test]
    fn unknown_role_keeps_default() {
        let config = SessionConfig::from_lookup(lookup(&[("RXOFFICE_DEFAULT_ROLE", "Owner")]));
        assert_eq!(config.default_signup_role, Role::Cashier);
    }
}
