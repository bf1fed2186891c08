//! Service configuration from environment variables.

use crate::catalog::ReflectOptions;
use crate::error::CatalogError;
use crate::model::ResolveOptions;
use regex::Regex;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub bind: SocketAddr,
    pub schemas: Vec<String>,
    pub exclude_tables: Vec<Regex>,
    /// "" or a path like "/api/v1" (leading slash, no trailing slash).
    pub api_prefix: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub strict: bool,
    pub read_only: bool,
    pub cors: bool,
    pub body_limit_bytes: usize,
}

impl ServiceConfig {
    /// Read `DATABASE_URL` and the `AUTOCRUD_*` variables.
    pub fn from_env() -> Result<Self, CatalogError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CatalogError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or_else(|| CatalogError::Config("DATABASE_URL is required".into()))?;
        let bind = parse_or(get("AUTOCRUD_BIND"), "AUTOCRUD_BIND", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let mut schemas = split_list(get("AUTOCRUD_SCHEMAS").as_deref());
        if schemas.is_empty() {
            schemas.push("public".into());
        }
        let exclude_tables = split_list(get("AUTOCRUD_EXCLUDE_TABLES").as_deref())
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{})$", p))
                    .map_err(|e| CatalogError::Config(format!("AUTOCRUD_EXCLUDE_TABLES: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let api_prefix = normalize_prefix(get("AUTOCRUD_API_PREFIX").as_deref().unwrap_or(""));
        let max_connections = parse_or(get("AUTOCRUD_MAX_CONNECTIONS"), "AUTOCRUD_MAX_CONNECTIONS", 5u32)?;
        let connect_timeout_secs = parse_or(get("AUTOCRUD_CONNECT_TIMEOUT_SECS"), "AUTOCRUD_CONNECT_TIMEOUT_SECS", 10u64)?;
        let default_page_size = parse_or(get("AUTOCRUD_DEFAULT_PAGE_SIZE"), "AUTOCRUD_DEFAULT_PAGE_SIZE", 10u32)?;
        let max_page_size = parse_or(get("AUTOCRUD_MAX_PAGE_SIZE"), "AUTOCRUD_MAX_PAGE_SIZE", 100u32)?;
        if max_connections == 0 {
            return Err(CatalogError::Config("AUTOCRUD_MAX_CONNECTIONS must be at least 1".into()));
        }
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err(CatalogError::Config(format!(
                "AUTOCRUD_DEFAULT_PAGE_SIZE must be between 1 and AUTOCRUD_MAX_PAGE_SIZE ({})",
                max_page_size
            )));
        }

        Ok(ServiceConfig {
            database_url,
            bind,
            schemas,
            exclude_tables,
            api_prefix,
            max_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            default_page_size,
            max_page_size,
            strict: parse_bool(get("AUTOCRUD_STRICT"), "AUTOCRUD_STRICT", false)?,
            read_only: parse_bool(get("AUTOCRUD_READ_ONLY"), "AUTOCRUD_READ_ONLY", false)?,
            cors: parse_bool(get("AUTOCRUD_CORS"), "AUTOCRUD_CORS", true)?,
            body_limit_bytes: parse_or(get("AUTOCRUD_BODY_LIMIT_BYTES"), "AUTOCRUD_BODY_LIMIT_BYTES", 1024 * 1024)?,
        })
    }

    pub fn reflect_options(&self) -> ReflectOptions {
        ReflectOptions {
            schemas: self.schemas.clone(),
            exclude: self.exclude_tables.clone(),
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            default_schema: self.schemas.first().cloned().unwrap_or_else(|| "public".into()),
            api_prefix: self.api_prefix.clone(),
            read_only: self.read_only,
            strict: self.strict,
        }
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, CatalogError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| CatalogError::Config(format!("{}={}: {}", key, v, e))),
    }
}

fn parse_bool(raw: Option<String>, key: &str, default: bool) -> Result<bool, CatalogError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(CatalogError::Config(format!("{}={}: expected true or false", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig, CatalogError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServiceConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let c = config(&[("DATABASE_URL", "postgres://localhost/shop")]).unwrap();
        assert_eq!(c.bind.to_string(), "0.0.0.0:3000");
        assert_eq!(c.schemas, vec!["public".to_string()]);
        assert_eq!(c.api_prefix, "");
        assert_eq!(c.max_connections, 5);
        assert_eq!(c.connect_timeout, Duration::from_secs(10));
        assert_eq!((c.default_page_size, c.max_page_size), (10, 100));
        assert!(!c.strict && !c.read_only && c.cors);
        assert_eq!(c.body_limit_bytes, 1_048_576);
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(config(&[]), Err(CatalogError::Config(_))));
    }

    #[test]
    fn lists_prefix_and_flags() {
        let c = config(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("AUTOCRUD_SCHEMAS", "sales, public"),
            ("AUTOCRUD_EXCLUDE_TABLES", "_sqlx_migrations, audit_.*"),
            ("AUTOCRUD_API_PREFIX", "api/v1/"),
            ("AUTOCRUD_READ_ONLY", "TRUE"),
        ])
        .unwrap();
        assert_eq!(c.schemas, vec!["sales".to_string(), "public".to_string()]);
        assert_eq!(c.api_prefix, "/api/v1");
        assert!(c.read_only);
        let reflect = c.reflect_options();
        assert!(reflect.is_excluded("public", "audit_log"));
        assert!(!reflect.is_excluded("public", "orders"));
        assert_eq!(c.resolve_options().default_schema, "sales");
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for (k, v) in [
            ("AUTOCRUD_BIND", "nowhere"),
            ("AUTOCRUD_MAX_PAGE_SIZE", "-1"),
            ("AUTOCRUD_STRICT", "maybe"),
            ("AUTOCRUD_EXCLUDE_TABLES", "(unclosed"),
            ("AUTOCRUD_DEFAULT_PAGE_SIZE", "500"),
        ] {
            let err = config(&[("DATABASE_URL", "postgres://localhost/shop"), (k, v)]).unwrap_err();
            assert!(matches!(err, CatalogError::Config(_)), "{k}");
        }
    }
}
