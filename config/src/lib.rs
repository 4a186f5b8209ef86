use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const DEFAULT_PORT: u16 = 443;

/// Server configuration, read once at startup from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub tls_cert_file: PathBuf,
    pub tls_key_file: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = require("API_KEY")?;
        let tls_cert_file = require("TLS_CERT_FILE")?.into();
        let tls_key_file = require("TLS_KEY_FILE")?.into();
        let port = match env::var("PORT") {
            Ok(port) if !port.is_empty() => port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?,
            _ => DEFAULT_PORT,
        };

        Ok(Self {
            api_key,
            tls_cert_file,
            tls_key_file,
            port,
        })
    }
}

fn require(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("{name} environment variable is not set"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    // single test so the process environment is only touched from one thread
    #[test]
    fn config_from_env() {
        env::remove_var("API_KEY");
        env::remove_var("TLS_CERT_FILE");
        env::remove_var("TLS_KEY_FILE");
        env::remove_var("PORT");

        assert!(Config::from_env().is_err());

        env::set_var("API_KEY", "secret");
        assert!(Config::from_env().is_err());

        env::set_var("TLS_CERT_FILE", "/certs/tls.crt");
        env::set_var("TLS_KEY_FILE", "/certs/tls.key");

        let config = Config::from_env().unwrap();
        assert_eq!("secret", config.api_key);
        assert_eq!(Path::new("/certs/tls.crt"), config.tls_cert_file);
        assert_eq!(Path::new("/certs/tls.key"), config.tls_key_file);
        assert_eq!(DEFAULT_PORT, config.port);

        env::set_var("PORT", "8443");
        assert_eq!(8443, Config::from_env().unwrap().port);

        env::set_var("PORT", "");
        assert_eq!(DEFAULT_PORT, Config::from_env().unwrap().port);

        env::set_var("PORT", "not-a-port");
        assert!(Config::from_env().is_err());

        env::set_var("API_KEY", "");
        env::set_var("PORT", "8443");
        assert!(Config::from_env().is_err());
    }
}
