//! CLI configuration: thin wrapper around `rollcall_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--server, --token, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use rollcall_api::{Credentials, TlsMode};
use rollcall_core::{ClientConfig, ViewDefaults};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use rollcall_config::{
    Config, Defaults, Profile, config_dir, config_path, load_config_or_default, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Everything a command needs to talk to the service.
pub struct Resolved {
    pub client: ClientConfig,
    pub view: ViewDefaults,
}

/// Build the client configuration for this invocation.
///
/// Flags win over the profile. With `--server` and no matching profile the
/// flags alone are used; otherwise a missing profile is an error.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match (config.profiles.get(&name), &global.server) {
        (Some(p), _) => p.clone(),
        (None, Some(_)) => Profile::default(),
        (None, None) if global.profile.is_some() => {
            return Err(rollcall_config::ConfigError::UnknownProfile { name }.into());
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    let mut client = rollcall_config::profile_to_client_config(&profile, &name, &config.defaults)?;

    if let Some(ref token) = global.token {
        client.credentials = Credentials::Bearer {
            token: SecretString::from(token.clone()),
        };
    }
    if global.insecure {
        client.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }

    let view = config.view_defaults(Some(&profile))?;
    Ok(Resolved { client, view })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["rollcall"];
        argv.extend_from_slice(args);
        argv.push("config");
        argv.push("show");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_school() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                server: "https://school.example/api/".into(),
                page_size: Some(20),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn server_flag_works_without_any_profile() {
        let g = global(&["--server", "http://127.0.0.1:9/api/"]);
        let resolved = resolve(&g, &Config::default()).unwrap();
        assert_eq!(resolved.client.base_url.as_str(), "http://127.0.0.1:9/api/");
        assert!(matches!(resolved.client.credentials, Credentials::Anonymous));
        assert_eq!(resolved.view.page_size, rollcall_core::query::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn missing_config_is_reported() {
        let g = global(&[]);
        let err = resolve(&g, &Config::default()).err().unwrap();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }

    #[test]
    fn unknown_named_profile_is_reported() {
        let g = global(&["--profile", "nope"]);
        let err = resolve(&g, &config_with_school()).err().unwrap();
        assert!(matches!(err, CliError::ProfileNotFound { .. }));
    }

    #[test]
    fn flags_override_profile() {
        let g = global(&["--token", "t0k", "--insecure", "--timeout", "5"]);
        let resolved = resolve(&g, &config_with_school()).unwrap();
        match resolved.client.credentials {
            Credentials::Bearer { ref token } => assert_eq!(token.expose_secret(), "t0k"),
            _ => panic!("expected bearer token"),
        }
        assert!(matches!(resolved.client.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(resolved.client.timeout, Duration::from_secs(5));
        assert_eq!(resolved.view.page_size, 20);
    }
}
