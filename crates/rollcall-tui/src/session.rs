//! Connection resolution: config profile, overlaid by command-line flags.

use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::eyre::{Result, eyre};
use rollcall_api::{Credentials, ListingClient, TlsMode};
use rollcall_config::{Config, Profile};
use rollcall_core::{ClientConfig, HttpSource, ListItem, ViewDefaults};
use secrecy::SecretString;

use crate::Cli;

/// Everything the screens need to reach the service.
pub struct Session {
    client: Arc<ListingClient>,
    view: ViewDefaults,
    views_dir: PathBuf,
}

impl Session {
    /// Priority: flags > named profile > default profile.
    pub fn connect(cli: &Cli) -> Result<Self> {
        let cfg = rollcall_config::load_config_or_default();
        let client = resolve(cli, &cfg)?.build_client()?;
        let profile = cfg.profile(cli.profile.as_deref()).ok().map(|(_, p)| p);
        let view = cfg.view_defaults(profile)?;
        Ok(Self {
            client,
            view,
            views_dir: rollcall_config::config_dir().join("views"),
        })
    }

    pub fn server(&self) -> &url::Url {
        self.client.base_url()
    }

    pub fn source<T: ListItem>(&self) -> Arc<HttpSource<T>> {
        Arc::new(HttpSource::new(Arc::clone(&self.client)))
    }

    pub fn view(&self) -> ViewDefaults {
        self.view
    }

    /// Directory for per-collection saved views.
    pub fn views_dir(&self) -> &std::path::Path {
        &self.views_dir
    }
}

fn resolve(cli: &Cli, cfg: &Config) -> Result<ClientConfig> {
    let (name, mut profile) = match cfg.profile(cli.profile.as_deref()) {
        Ok((name, profile)) => (name.to_owned(), profile.clone()),
        Err(_) if cli.server.is_some() => ("default".to_owned(), Profile::default()),
        Err(e) if cli.profile.is_some() => return Err(e.into()),
        Err(_) => {
            return Err(eyre!(
                "no profile configured at {}; run `rollcall config init` or pass --server",
                rollcall_config::config_path().display()
            ));
        }
    };

    if let Some(ref server) = cli.server {
        profile.server.clone_from(server);
    }

    let mut client = rollcall_config::profile_to_client_config(&profile, &name, &cfg.defaults)?;
    if let Some(ref token) = cli.token {
        client.credentials = Credentials::Bearer {
            token: SecretString::from(token.clone()),
        };
    }
    if cli.insecure {
        client.tls = TlsMode::DangerAcceptInvalid;
    }
    Ok(client)
}
