//! Jenkinsfile check
//!
//! A Jenkinsfile is only expected in private repositories, and it must run
//! the security scan step.

use crate::checks::{CheckContext, CustomCheck};
use crate::error::AppResult;
use crate::models::{Repository, Visibility};
use async_trait::async_trait;
use tracing::debug;

const JENKINSFILE: &str = "Jenkinsfile";

/// Flags public Jenkinsfiles and pipelines without `securityScan()`
pub struct JenkinsfileCheck;

impl JenkinsfileCheck {
    pub const NAME: &'static str = "jenkinsfile";
}

/// True when at least one uncommented line invokes the scan.
/// Lines containing `/` are treated as comments.
pub fn has_security_scan(content: &str) -> bool {
    content
        .lines()
        .any(|line| line.contains("securityScan") && !line.contains('/'))
}

#[async_trait]
impl CustomCheck for JenkinsfileCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self, repo: &Repository, ctx: &mut CheckContext<'_>) -> AppResult<()> {
        if !repo.private && repo.fork {
            return Ok(());
        }

        let content = match ctx.client.get_file_contents(ctx.org, &repo.name, JENKINSFILE).await {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                debug!("{} has no {}", repo.name, JENKINSFILE);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if repo.visibility() == Visibility::Public {
            ctx.findings.push(format!(
                "Public repo {} has a Jenkinsfile, this is probably an error!",
                repo.name
            ));
        }

        if !has_security_scan(&content) {
            ctx.findings.push(format!(
                "{} repo {} has Jenkinsfile without securityScan() enabled!",
                repo.visibility(),
                repo.name
            ));
        }

        Ok(())
    }
}
