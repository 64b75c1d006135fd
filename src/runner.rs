use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{PublishMode, RunConfig};
use crate::error::Result;
use crate::github::TagPlatform;
use crate::publish::{self, Published};
use crate::version::{self, DerivedVersion};

/// Result of one run, ready to be reported.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub level: String,
    /// Highest existing version the new one was derived from.
    pub previous: String,
    pub version: String,
    pub version_dns: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub mode: PublishMode,
    /// `None` for dry runs.
    pub published: Option<Published>,
}

impl Outcome {
    fn new(
        config: &RunConfig,
        previous: &semver::Version,
        next: &DerivedVersion,
        published: Option<Published>,
    ) -> Self {
        Self {
            level: config.level.to_string(),
            previous: version::tag_label(previous),
            version: next.tag_name(),
            version_dns: next.dns_name(),
            major: next.major,
            minor: next.minor,
            patch: next.patch,
            mode: config.mode,
            published,
        }
    }
}

/// Fetch tags, derive the next version for `today`, and publish it.
///
/// Every failure ends the run. Nothing is retried or rolled back.
pub async fn run(
    platform: &dyn TagPlatform,
    config: &RunConfig,
    today: NaiveDate,
) -> Result<Outcome> {
    info!(level = %config.level, repo = %config.repository, "updating version");

    let tags = platform.list_tags(&config.repository).await?;
    let candidates = version::valid_semver_tags(&tags);
    debug!(total = tags.len(), valid = candidates.len(), "filtered version tags");

    let current = version::current_version(candidates);
    let current_label = version::tag_label(&current);
    info!(current = %current_label, "found latest version");

    let next = version::derive_next(&current, &config.level, today)?;
    debug!(next = %next, today = %today, "derived next version");

    if config.dry_run {
        info!(version = %next, mode = config.mode.as_str(), "dry run, skipping publish");
        return Ok(Outcome::new(config, &current, &next, None));
    }

    let published = publish::publish(
        platform,
        &config.repository,
        config.mode,
        &next,
        &config.sha,
        &config.server_url,
    )
    .await?;

    Ok(Outcome::new(config, &current, &next, Some(published)))
}
