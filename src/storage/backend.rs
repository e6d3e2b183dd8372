//! Supported SQL backends and their connection-string strategies

use std::fmt;
use std::str::FromStr;

use secrecy::ExposeSecret;
use url::Url;

use super::config::DbConfig;
use super::error::{DbError, DbResult};

/// SQL database family selected by the `DB_CONNECTOR` identifier.
///
/// Resolved once when the connection is opened; every backend-specific decision
/// (URL scheme, TLS parameter names, placeholder syntax, schema DDL) hangs off this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Postgres,
    MySql,
}

impl Backend {
    /// Resolve the configured connector identifier.
    ///
    /// # Errors
    ///
    /// `MissingConnector` when no identifier was configured, `UnknownConnector` for
    /// anything outside the supported set.
    pub fn from_connector(connector: Option<&str>) -> DbResult<Self> {
        match connector {
            Some(raw) => raw.parse(),
            None => Err(DbError::MissingConnector),
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::MySql => "mysql",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Backend::Postgres => 5432,
            Backend::MySql => 3306,
        }
    }

    /// Build the URL-form connection string for this backend.
    ///
    /// Credentials are percent-encoded. TLS settings are applied the same way for every
    /// backend, only the query parameter names differ.
    ///
    /// # Example
    ///
    /// ```
    /// use tgbase::storage::{Backend, DbConfig};
    ///
    /// let mut config = DbConfig::for_connector("pgsql");
    /// config.database = "bot".to_string();
    /// let url = Backend::Postgres.connection_url(&config).unwrap();
    /// assert_eq!(url, "postgres://localhost:5432/bot");
    /// ```
    pub fn connection_url(self, config: &DbConfig) -> DbResult<String> {
        let mut url = Url::parse(&format!("{}://localhost", self.scheme()))
            .map_err(|e| DbError::Config(format!("connection url: {e}")))?;

        url.set_host(Some(&config.host))
            .map_err(|e| DbError::Config(format!("DB_HOST={:?}: {e}", config.host)))?;
        url.set_port(Some(config.port.unwrap_or_else(|| self.default_port())))
            .map_err(|()| DbError::Config("DB_PORT cannot be applied to this host".to_string()))?;

        let password = config.password.expose_secret();
        if config.username.is_empty() {
            if !password.is_empty() {
                return Err(DbError::Config("DB_PASSWORD is set but DB_USERNAME is empty".to_string()));
            }
        } else {
            url.set_username(&config.username)
                .map_err(|()| DbError::Config("DB_USERNAME cannot be applied to this host".to_string()))?;
            if !password.is_empty() {
                url.set_password(Some(password))
                    .map_err(|()| DbError::Config("DB_PASSWORD cannot be applied to this host".to_string()))?;
            }
        }

        url.set_path(&config.database);

        let mut params: Vec<(&'static str, String)> = Vec::new();
        if let Some(mode) = config.ssl_mode {
            params.push((self.ssl_mode_param(), mode.as_param(self).to_string()));
        }
        let (root_cert, cert, key) = self.ssl_file_params();
        let files = [
            (root_cert, &config.ssl_root_cert),
            (cert, &config.ssl_cert),
            (key, &config.ssl_key),
        ];
        params.extend(
            files
                .into_iter()
                .filter_map(|(name, path)| path.as_ref().map(|p| (name, p.display().to_string()))),
        );

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.into())
    }

    fn ssl_mode_param(self) -> &'static str {
        match self {
            Backend::Postgres => "sslmode",
            Backend::MySql => "ssl-mode",
        }
    }

    /// (root certificate, client certificate, client key) parameter names
    fn ssl_file_params(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Backend::Postgres => ("sslrootcert", "sslcert", "sslkey"),
            Backend::MySql => ("ssl-ca", "ssl-cert", "ssl-key"),
        }
    }
}

impl FromStr for Backend {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" => Ok(Backend::Postgres),
            "mysql" | "mariadb" => Ok(Backend::MySql),
            _ => Err(DbError::UnknownConnector(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Postgres => write!(f, "PostgreSQL"),
            Backend::MySql => write!(f, "MySQL"),
        }
    }
}

/// Transport security level, shared by every backend.
///
/// Parsed from either the Postgres spelling (`verify-full`) or the MySQL spelling
/// (`VERIFY_IDENTITY`), case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    /// Parameter value understood by `backend`'s driver
    pub fn as_param(self, backend: Backend) -> &'static str {
        match backend {
            Backend::Postgres => match self {
                SslMode::Disable => "disable",
                SslMode::Allow => "allow",
                SslMode::Prefer => "prefer",
                SslMode::Require => "require",
                SslMode::VerifyCa => "verify-ca",
                SslMode::VerifyFull => "verify-full",
            },
            // MySQL has no "allow": it already falls back to plaintext under PREFERRED
            Backend::MySql => match self {
                SslMode::Disable => "DISABLED",
                SslMode::Allow | SslMode::Prefer => "PREFERRED",
                SslMode::Require => "REQUIRED",
                SslMode::VerifyCa => "VERIFY_CA",
                SslMode::VerifyFull => "VERIFY_IDENTITY",
            },
        }
    }
}

impl FromStr for SslMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "disable" | "disabled" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" | "preferred" => Ok(SslMode::Prefer),
            "require" | "required" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify-identity" => Ok(SslMode::VerifyFull),
            _ => Err(DbError::Config(format!("DB_SSL_MODE={s:?} is not a known SSL mode"))),
        }
    }
}
