use serde::Serialize;
use tracing::{info, warn};

use crate::config::{PublishMode, Repository};
use crate::error::Result;
use crate::github::{NewRelease, NewTag, TagPlatform};
use crate::version::DerivedVersion;

/// What a successful publish left on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published {
    pub mode: PublishMode,
    pub tag_name: String,
    pub target_sha: String,
    /// SHA of the annotated tag object (tag mode only).
    pub tag_object_sha: Option<String>,
    /// Web URL of the release (release mode only).
    pub release_url: Option<String>,
}

/// Changelog link used as the release body.
pub fn release_body(server_url: &str, repo: &Repository, tag_name: &str) -> String {
    format!(
        "**Full Changelog**: {}/{}/{}/commits/{}",
        server_url.trim_end_matches('/'),
        repo.owner,
        repo.name,
        tag_name
    )
}

/// Publish `version` on `sha` according to `mode`.
pub async fn publish(
    platform: &dyn TagPlatform,
    repo: &Repository,
    mode: PublishMode,
    version: &DerivedVersion,
    sha: &str,
    server_url: &str,
) -> Result<Published> {
    match mode {
        PublishMode::Tag => publish_tag(platform, repo, version, sha).await,
        PublishMode::Release => publish_release(platform, repo, version, sha, server_url).await,
    }
}

/// Create the tag object, then the `refs/tags/*` reference pointing at it.
///
/// The two calls are not atomic. If the reference fails, the tag object stays
/// behind unreferenced and the error is returned as-is; nothing is rolled back.
async fn publish_tag(
    platform: &dyn TagPlatform,
    repo: &Repository,
    version: &DerivedVersion,
    sha: &str,
) -> Result<Published> {
    let tag_name = version.tag_name();
    let request = NewTag {
        tag: tag_name.clone(),
        message: format!("Version {tag_name}"),
        object: sha.to_string(),
        object_type: "commit".to_string(),
    };

    let created = platform.create_tag(repo, &request).await?;
    let ref_name = format!("refs/tags/{}", created.tag);

    if let Err(err) = platform.create_ref(repo, &ref_name, &created.sha).await {
        warn!(
            tag_object = %created.sha,
            ref_name = %ref_name,
            error = %err,
            "tag object was created but its reference was not; it is orphaned"
        );
        return Err(err);
    }

    info!(tag = %tag_name, sha = %sha, "tag created on commit");

    Ok(Published {
        mode: PublishMode::Tag,
        tag_name,
        target_sha: sha.to_string(),
        tag_object_sha: Some(created.sha),
        release_url: None,
    })
}

async fn publish_release(
    platform: &dyn TagPlatform,
    repo: &Repository,
    version: &DerivedVersion,
    sha: &str,
    server_url: &str,
) -> Result<Published> {
    let tag_name = version.tag_name();
    let request = NewRelease {
        tag_name: tag_name.clone(),
        name: tag_name.clone(),
        body: release_body(server_url, repo, &tag_name),
        draft: false,
        prerelease: false,
        target_commitish: sha.to_string(),
    };

    let created = platform.create_release(repo, &request).await?;
    info!(tag = %tag_name, sha = %sha, release_id = created.id, "release created on commit");

    Ok(Published {
        mode: PublishMode::Release,
        tag_name,
        target_sha: sha.to_string(),
        tag_object_sha: None,
        release_url: Some(created.html_url).filter(|url| !url.is_empty()),
    })
}
