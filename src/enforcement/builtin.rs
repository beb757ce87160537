//! Built-in repository checks
//!
//! License, vulnerability alert and default branch protection checks. Each
//! returns the findings it produced; "not found" from the platform means the
//! feature is absent and is never an error here.

use crate::error::AppResult;
use crate::github::RepoClient;
use crate::models::Repository;
use crate::policy::{should_enforce, should_remediate, PolicyDocument};
use crate::settings::coerce::coerced;
use crate::settings::{ReconciliationEngine, SettingsNode};
use tracing::{debug, error};

/// Prefix for branch protection findings that were written back
pub const REMEDIATED_PREFIX: &str = "REMEDIATED: ";

/// Prefix for branch protection findings whose write-back failed
pub const FAILED_REMEDIATION_PREFIX: &str = "FAILED TO REMEDIATE: ";

/// Mandatory license and license allow-list
pub fn license_findings(policy: &PolicyDocument, repo: &Repository) -> Vec<String> {
    let mut findings = Vec::new();

    if should_enforce(policy.mandatory_license(repo), Some(repo)) && repo.license.is_none() {
        findings.push(format!(
            "{} repo {} is missing license!!",
            repo.visibility(),
            repo.name
        ));
    }

    let allowed = policy.allowed_licenses(repo);
    if let (Some(key), Some(allowed)) = (repo.license_key(), allowed) {
        if should_enforce(Some(allowed), Some(repo)) && !allowed.approved_keys.iter().any(|k| k == key) {
            findings.push(format!(
                "{} repo {} with license '{}' is not allowed. Expected: {}",
                repo.visibility(),
                repo.name,
                key,
                allowed.approved_keys.join(",")
            ));
        }
    }

    findings
}

/// Vulnerability alerts must be enabled; enable them when remediating
pub async fn vulnerability_alert_findings(
    client: &dyn RepoClient,
    org: &str,
    policy: &PolicyDocument,
    repo: &Repository,
) -> AppResult<Vec<String>> {
    let section = policy.vulnerability_checks(repo);
    if !should_enforce(section, Some(repo)) {
        return Ok(Vec::new());
    }

    // Only 204 means enabled; 404 is the platform's "disabled"
    let enabled = match client.vulnerability_alerts_status(org, &repo.name).await {
        Ok(status) => status == 204,
        Err(e) if e.is_not_found() => false,
        Err(e) => return Err(e),
    };
    if enabled {
        return Ok(Vec::new());
    }

    let finding = format!("{} does not have vulnerability alerts enabled!", repo.name);
    if !should_remediate(section, Some(repo)) {
        return Ok(vec![finding]);
    }

    let outcome = match client.enable_vulnerability_alerts(org, &repo.name).await {
        Ok(true) => format!("REMEDIATION: {} vulnerability alerts have been enabled!", repo.name),
        Ok(false) => format!("REMEDIATION FAILED: {}", finding),
        Err(e) => {
            error!("Failed to enable vulnerability alerts for {}: {}", repo.name, e);
            format!("REMEDIATION FAILED: {}", finding)
        }
    };
    Ok(vec![outcome])
}

/// Current default branch protection, coerced into update shape.
/// An unprotected branch reads as an empty tree.
pub async fn current_branch_protection(
    client: &dyn RepoClient,
    org: &str,
    repo: &Repository,
) -> AppResult<SettingsNode> {
    match client.get_branch_protection(org, &repo.name, &repo.default_branch).await {
        Ok(settings) => Ok(coerced(settings)),
        Err(e) if e.is_not_found() => {
            debug!("{}:{} has no branch protection", repo.name, repo.default_branch);
            Ok(SettingsNode::empty())
        }
        Err(e) => Err(e),
    }
}

/// Default branch protection must match the policy's target settings
pub async fn branch_protection_findings(
    client: &dyn RepoClient,
    org: &str,
    policy: &PolicyDocument,
    repo: &Repository,
) -> AppResult<Vec<String>> {
    let Some(section) = policy.branch_protections(repo) else {
        return Ok(Vec::new());
    };
    if !should_enforce(Some(section), Some(repo)) {
        return Ok(Vec::new());
    }

    let current = current_branch_protection(client, org, repo).await?;
    let reconciliation = ReconciliationEngine::reconcile(&section.protections, &current);
    if !reconciliation.has_changes() {
        return Ok(Vec::new());
    }

    let prefix = if should_remediate(Some(section), Some(repo)) {
        match client
            .update_branch_protection(org, &repo.name, &repo.default_branch, &reconciliation.merged)
            .await
        {
            Ok(()) => REMEDIATED_PREFIX,
            Err(e) => {
                error!("Failed to update branch protection for {}: {}", repo.name, e);
                FAILED_REMEDIATION_PREFIX
            }
        }
    } else {
        ""
    };

    Ok(reconciliation
        .messages()
        .into_iter()
        .map(|message| format!("{}{}", prefix, message))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::github::fake::FakeClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn policy(yaml: &str) -> PolicyDocument {
        PolicyDocument::from_yaml_str(yaml).unwrap()
    }

    const LICENSE_POLICY: &str = r#"
public:
  licenses:
    mandatory:
      enforcement_policy: notify
      repo_exceptions: [scratch]
    allowed:
      enforcement_policy: notify
      approvedKeys: [mit, apache-2.0]
"#;

    #[test]
    fn test_missing_license() {
        let policy = policy(LICENSE_POLICY);
        let findings = license_findings(&policy, &FakeClient::repo("svc", false, None));
        assert_eq!(findings, vec!["Public repo svc is missing license!!".to_string()]);
    }

    #[test]
    fn test_missing_license_exception() {
        let policy = policy(LICENSE_POLICY);
        assert!(license_findings(&policy, &FakeClient::repo("scratch", false, None)).is_empty());
    }

    #[test]
    fn test_license_not_on_allow_list() {
        let policy = policy(LICENSE_POLICY);
        let findings = license_findings(&policy, &FakeClient::repo("svc", false, Some("gpl-3.0")));
        assert_eq!(
            findings,
            vec!["Public repo svc with license 'gpl-3.0' is not allowed. Expected: mit,apache-2.0".to_string()]
        );
        assert!(license_findings(&policy, &FakeClient::repo("svc", false, Some("mit"))).is_empty());
    }

    #[test]
    fn test_license_policy_is_scoped_by_visibility() {
        let policy = policy(LICENSE_POLICY);
        assert!(license_findings(&policy, &FakeClient::repo("internal", true, None)).is_empty());
    }

    const VULN_NOTIFY: &str = "public:\n  vulnerabilityChecks:\n    enforcement_policy: notify\n";
    const VULN_REMEDIATE: &str = "public:\n  vulnerabilityChecks:\n    enforcement_policy: remediate\n";

    #[tokio::test]
    async fn test_vulnerability_alerts_disabled_notify() {
        let client = FakeClient::default();
        let repo = FakeClient::repo("svc", false, None);

        let findings = vulnerability_alert_findings(&client, "acme", &policy(VULN_NOTIFY), &repo)
            .await
            .unwrap();
        assert_eq!(findings, vec!["svc does not have vulnerability alerts enabled!".to_string()]);
        assert!(client.enabled_alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vulnerability_alerts_enabled() {
        let mut client = FakeClient::default();
        client.alerts_enabled.insert("svc".to_string());
        let repo = FakeClient::repo("svc", false, None);

        let findings = vulnerability_alert_findings(&client, "acme", &policy(VULN_REMEDIATE), &repo)
            .await
            .unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_vulnerability_alerts_non_204_success_is_disabled() {
        let mut client = FakeClient::default();
        client.alerts_status.insert("svc".to_string(), 200);
        let repo = FakeClient::repo("svc", false, None);

        let findings = vulnerability_alert_findings(&client, "acme", &policy(VULN_NOTIFY), &repo)
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[tokio::test]
    async fn test_vulnerability_alerts_remediated() {
        let client = FakeClient::default();
        let repo = FakeClient::repo("svc", false, None);

        let findings = vulnerability_alert_findings(&client, "acme", &policy(VULN_REMEDIATE), &repo)
            .await
            .unwrap();
        assert_eq!(
            findings,
            vec!["REMEDIATION: svc vulnerability alerts have been enabled!".to_string()]
        );
        assert_eq!(*client.enabled_alerts.lock().unwrap(), vec!["svc".to_string()]);
    }

    #[tokio::test]
    async fn test_vulnerability_alerts_remediation_failure_is_a_finding() {
        let client = FakeClient {
            fail_writes: true,
            ..FakeClient::default()
        };
        let repo = FakeClient::repo("svc", false, None);

        let findings = vulnerability_alert_findings(&client, "acme", &policy(VULN_REMEDIATE), &repo)
            .await
            .unwrap();
        assert_eq!(
            findings,
            vec!["REMEDIATION FAILED: svc does not have vulnerability alerts enabled!".to_string()]
        );
    }

    #[tokio::test]
    async fn test_vulnerability_probe_failure_propagates() {
        let mut client = FakeClient::default();
        client.alerts_broken.insert("svc".to_string());
        let repo = FakeClient::repo("svc", false, None);

        let result = vulnerability_alert_findings(&client, "acme", &policy(VULN_NOTIFY), &repo).await;
        assert!(matches!(result, Err(AppError::Remote { .. })));
    }

    fn protection_policy(mode: &str) -> PolicyDocument {
        policy(&format!(
            r#"
public:
  defaultBranchProtections:
    enforcement_policy: {}
    protections:
      enforce_admins: true
      allow_force_pushes: false
      required_pull_request_reviews:
        dismiss_stale_reviews: true
"#,
            mode
        ))
    }

    fn protected_client() -> FakeClient {
        let mut client = FakeClient::default();
        client.protections.insert(
            "svc".to_string(),
            SettingsNode::from(json!({
                "url": "https://api.github.com/repos/acme/svc/branches/main/protection",
                "enforce_admins": { "url": "https://api.github.com/x", "enabled": false },
                "allow_force_pushes": { "enabled": true },
                "required_pull_request_reviews": {
                    "url": "https://api.github.com/y",
                    "dismiss_stale_reviews": true,
                    "required_approving_review_count": 1
                }
            })),
        );
        client
    }

    #[tokio::test]
    async fn test_branch_protection_notify_only() {
        let client = protected_client();
        let repo = FakeClient::repo("svc", false, None);

        let findings = branch_protection_findings(&client, "acme", &protection_policy("notify"), &repo)
            .await
            .unwrap();

        assert_eq!(
            findings,
            vec![
                "protections.allow_force_pushes should be: false".to_string(),
                "protections.enforce_admins should be: true".to_string(),
            ]
        );
        assert_eq!(client.update_count(), 0);
    }

    #[tokio::test]
    async fn test_branch_protection_remediated() {
        let client = protected_client();
        let repo = FakeClient::repo("svc", false, None);

        let findings = branch_protection_findings(&client, "acme", &protection_policy("remediate"), &repo)
            .await
            .unwrap();

        assert_eq!(
            findings,
            vec![
                "REMEDIATED: protections.allow_force_pushes should be: false".to_string(),
                "REMEDIATED: protections.enforce_admins should be: true".to_string(),
            ]
        );

        let updates = client.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (name, branch, payload) = &updates[0];
        assert_eq!(name, "svc");
        assert_eq!(branch, "main");
        assert_eq!(
            *payload,
            SettingsNode::from(json!({
                "enforce_admins": true,
                "allow_force_pushes": false,
                "required_pull_request_reviews": {
                    "dismiss_stale_reviews": true,
                    "required_approving_review_count": 1
                },
                "required_status_checks": null,
                "restrictions": null
            }))
        );
    }

    #[tokio::test]
    async fn test_branch_protection_remediation_failure() {
        let mut client = protected_client();
        client.fail_writes = true;
        let repo = FakeClient::repo("svc", false, None);

        let findings = branch_protection_findings(&client, "acme", &protection_policy("remediate"), &repo)
            .await
            .unwrap();

        assert!(findings.iter().all(|f| f.starts_with(FAILED_REMEDIATION_PREFIX)));
        assert_eq!(findings.len(), 2);
    }

    #[tokio::test]
    async fn test_branch_protection_in_compliance() {
        let mut client = protected_client();
        client.protections.insert(
            "svc".to_string(),
            SettingsNode::from(json!({
                "enforce_admins": { "enabled": true },
                "allow_force_pushes": { "enabled": false },
                "required_pull_request_reviews": { "dismiss_stale_reviews": true }
            })),
        );
        let repo = FakeClient::repo("svc", false, None);

        let findings = branch_protection_findings(&client, "acme", &protection_policy("remediate"), &repo)
            .await
            .unwrap();
        assert!(findings.is_empty());
        assert_eq!(client.update_count(), 0);
    }

    #[tokio::test]
    async fn test_unprotected_branch_has_nothing_to_compare() {
        let client = FakeClient::default();
        let repo = FakeClient::repo("svc", false, None);

        let current = current_branch_protection(&client, "acme", &repo).await.unwrap();
        assert_eq!(current, SettingsNode::empty());

        let findings = branch_protection_findings(&client, "acme", &protection_policy("remediate"), &repo)
            .await
            .unwrap();
        assert!(findings.is_empty());
    }
}
