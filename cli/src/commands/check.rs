use anyhow::Result;
use colored::*;
use serde::Serialize;

use authz::{Capability, PermissionEvaluator};

use crate::config::Runtime;

/// One directly listed principal as the running server would resolve it.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub group: String,
    pub capabilities: Vec<Capability>,
    pub max_resource_age_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub auth_scheme: String,
    pub port: u16,
    pub default_group: Option<String>,
    pub users: Vec<UserSummary>,
}

pub fn build_report(runtime: &Runtime) -> Result<CheckReport> {
    let evaluator: &PermissionEvaluator = &runtime.state.evaluator;
    let policy = evaluator.policy();

    let mut users: Vec<UserSummary> = evaluator
        .users()
        .into_values()
        .map(|user| UserSummary {
            group: policy
                .groups()
                .iter()
                .find(|g| g.contains(&user.id))
                .map(|g| g.name.clone())
                .unwrap_or_default(),
            capabilities: Capability::ALL
                .iter()
                .copied()
                .filter(|c| user.permission.allows(*c))
                .collect(),
            max_resource_age_secs: user.permission.max_resource_age().num_seconds(),
            id: user.id,
        })
        .collect();
    users.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(CheckReport {
        auth_scheme: runtime.state.authenticator.scheme().to_string(),
        port: runtime.server.port,
        default_group: policy.default_group().map(|g| g.name.clone()),
        users,
    })
}

/// Execute the check command
pub fn execute(runtime: &Runtime, format: &str) -> Result<()> {
    let report = build_report(runtime)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "yaml" => println!("{}", serde_yaml::to_string(&report)?),
        _ => print_report_text(&report),
    }

    Ok(())
}

fn print_report_text(report: &CheckReport) {
    println!("{}", "=== teleview configuration ===".bold());
    println!();
    println!("Status: {}", "OK".green().bold());
    println!("Auth scheme: {}", report.auth_scheme);
    println!("Port: {}", report.port);
    match &report.default_group {
        Some(group) => println!("Default group: {}", group),
        None => println!("Default group: {}", "none (unlisted users are denied)".yellow()),
    }
    println!();

    println!("{}", "Users:".bold());
    println!("{}", "─".repeat(50));
    if report.users.is_empty() {
        println!("  (no users listed in the policy)");
    }
    for user in &report.users {
        let capabilities: Vec<&str> = user.capabilities.iter().map(|c| c.as_str()).collect();
        println!(
            "{} ({}) max age {}s",
            user.id.bold(),
            user.group,
            user.max_resource_age_secs
        );
        println!("  {}", capabilities.join(", "));
    }
}
