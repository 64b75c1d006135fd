use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::version::Level;

/// Default GitHub REST API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default GitHub web root, used for changelog links in release bodies.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Config file looked up relative to the workspace when `--config` is not given.
pub const CONFIG_FILE_PATH: &str = ".github/datever.toml";

/// How the new version is published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// Annotated tag object plus a `refs/tags/*` reference.
    #[default]
    Tag,
    /// A release; the platform creates the tag as a side effect.
    Release,
}

impl PublishMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Release => "release",
        }
    }
}

/// Optional settings read from `.github/datever.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub publish: PublishConfig,
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub mode: Option<PublishMode>,
}

/// Endpoint overrides, mainly for GitHub Enterprise Server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: Option<String>,
    pub server_url: Option<String>,
}

/// `owner/name` of the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl FromStr for Repository {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(Error::Config(format!(
                "invalid repository '{raw}' -- expected owner/name"
            ))),
        }
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Raw inputs as collected from CLI flags and their environment fallbacks.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub level: String,
    pub mode: Option<PublishMode>,
    pub sha: Option<String>,
    pub repository: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub server_url: Option<String>,
    pub dry_run: bool,
}

/// Everything one run needs, with no further environment access.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub level: Level,
    pub mode: PublishMode,
    pub sha: String,
    pub repository: Repository,
    pub token: Option<String>,
    pub api_url: String,
    pub server_url: String,
    pub dry_run: bool,
}

impl RunConfig {
    /// Merge CLI inputs over file settings over defaults.
    ///
    /// `env` is consulted for `INPUT_GITHUB_TOKEN`, then the ambient `GITHUB_TOKEN`,
    /// when no token input was given. A token is mandatory unless this is a dry run.
    pub fn resolve(
        inputs: RunInputs,
        file: &FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let sha = non_blank(inputs.sha).ok_or_else(|| {
            Error::Config("commit SHA is missing -- set GITHUB_SHA or pass --sha".into())
        })?;

        let repository: Repository = non_blank(inputs.repository)
            .ok_or_else(|| {
                Error::Config(
                    "repository is missing -- set GITHUB_REPOSITORY or pass --repository".into(),
                )
            })?
            .parse()?;

        let token = non_blank(inputs.token)
            .or_else(|| non_blank(env("INPUT_GITHUB_TOKEN")))
            .or_else(|| non_blank(env("GITHUB_TOKEN")));
        if token.is_none() && !inputs.dry_run {
            return Err(Error::Auth(
                "no GitHub token available -- set GITHUB_TOKEN, the github_token input, or pass --token".into(),
            ));
        }

        let api_url = non_blank(inputs.api_url)
            .or_else(|| file.github.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let server_url = non_blank(inputs.server_url)
            .or_else(|| file.github.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        Ok(Self {
            level: Level::from(inputs.level.trim()),
            mode: inputs.mode.or(file.publish.mode).unwrap_or_default(),
            sha: sha.trim().to_string(),
            repository,
            token,
            api_url: api_url.trim_end_matches('/').to_string(),
            server_url: server_url.trim_end_matches('/').to_string(),
            dry_run: inputs.dry_run,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve the default config file path, rooted at `$GITHUB_WORKSPACE` when set.
pub fn config_path() -> PathBuf {
    match std::env::var("GITHUB_WORKSPACE") {
        Ok(workspace) if !workspace.trim().is_empty() => {
            PathBuf::from(workspace).join(CONFIG_FILE_PATH)
        }
        _ => PathBuf::from(CONFIG_FILE_PATH),
    }
}

/// Load config from the default location. Returns defaults when the file does not exist.
pub fn load() -> Result<FileConfig> {
    let path = config_path();

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(err) => {
            return Err(read_config_error(&path, err));
        }
    };

    parse(&raw).map_err(|err| parse_config_error(&path, err))
}

/// Load config from an explicit path.
///
/// Unlike [`load`], this returns an error when the file is missing.
pub fn load_from_path(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path).map_err(|err| read_config_error(path, err))?;
    parse(&raw).map_err(|err| parse_config_error(path, err))
}

fn parse(raw: &str) -> std::result::Result<FileConfig, toml::de::Error> {
    toml::from_str(raw)
}

fn read_config_error(path: &Path, err: std::io::Error) -> Error {
    Error::Config(format!(
        "failed to read config file '{}': {}",
        path.display(),
        err
    ))
}

fn parse_config_error(path: &Path, err: toml::de::Error) -> Error {
    Error::Config(format!(
        "failed to parse config file '{}': {}",
        path.display(),
        err
    ))
}
