//! Server configuration.

use std::net::SocketAddr;

use clap::Parser;

/// Command line and environment configuration for `relman-server`.
#[derive(Debug, Clone, Parser)]
#[command(name = "relman-server", version, about = "Release management API server")]
pub struct ServerConfig {
    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[arg(long, env = "RELMAN_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    #[arg(long, env = "RELMAN_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Start without applying pending migrations.
    #[arg(long, env = "RELMAN_SKIP_MIGRATIONS")]
    pub skip_migrations: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "RELMAN_LOG_JSON")]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::try_parse_from(["relman-server", "--database-url", "postgres://localhost/relman"])
                .unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 10);
        assert!(!config.skip_migrations);
        assert!(!config.log_json);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "relman-server",
            "--database-url",
            "postgres://db/relman",
            "--bind",
            "127.0.0.1:9000",
            "--max-connections",
            "3",
            "--skip-migrations",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.max_connections, 3);
        assert!(config.skip_migrations);
        assert!(config.log_json);
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let result = ServerConfig::try_parse_from([
            "relman-server",
            "--database-url",
            "postgres://db/relman",
            "--bind",
            "not-an-address",
        ]);
        assert!(result.is_err());
    }
}
