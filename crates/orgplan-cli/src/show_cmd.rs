//! `orgplan show`: print a saved OAG as a reporting forest and task list.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};

use orgplan_core::Oag;

pub fn load_oag(path: &Path) -> Result<Oag> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file {}", path.display()))?;
    Oag::from_json(&contents).with_context(|| format!("invalid plan file {}", path.display()))
}

pub fn run_show(path: &Path) -> Result<()> {
    let oag = load_oag(path)?;
    print!("{}", render(&oag));
    Ok(())
}

pub fn render(oag: &Oag) -> String {
    let mut out = String::new();
    let b = &oag.budget;
    let _ = writeln!(out, "{} ({})", oag.meta.title, oag.meta.domain);
    let _ = writeln!(out, "  project: {}", oag.meta.project_id);
    let _ = writeln!(out, "  created: {}", oag.meta.created_at.to_rfc3339());
    let _ = writeln!(
        out,
        "  budget:  {} | forecast ${:.2} | soft ${:.2} | hard ${:.2}",
        b.policy, b.forecast_cost_usd, b.soft_cap_usd, b.hard_cap_usd
    );
    out.push('\n');
    out.push_str("Organization:\n");
    out.push_str(&render_forest(oag));
    out.push('\n');
    out.push_str("Tasks:\n");
    out.push_str(&render_tasks(oag));
    out
}

/// Agents as an indented tree per reporting root.
pub fn render_forest(oag: &Oag) -> String {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in oag.reporting_edges() {
        children
            .entry(edge.from_id.as_str())
            .or_default()
            .push(edge.to_id.as_str());
    }

    let mut out = String::new();
    let mut visited = HashSet::new();
    for root in oag.roots() {
        walk(oag, &children, &root.id, 1, &mut visited, &mut out);
    }
    // Agents only reachable through a cycle have no root; list them flat.
    for agent in oag.get_agents() {
        if !visited.contains(agent.id.as_str()) {
            let _ = writeln!(out, "  {} [{}] (cycle)", agent.role, agent.level);
        }
    }
    out
}

fn walk<'a>(
    oag: &'a Oag,
    children: &HashMap<&'a str, Vec<&'a str>>,
    id: &'a str,
    depth: usize,
    visited: &mut HashSet<&'a str>,
    out: &mut String,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(agent) = oag.agent(id) else {
        return;
    };
    let okrs = agent.okrs.len();
    let _ = write!(out, "{}{} [{}]", "  ".repeat(depth), agent.role, agent.level);
    if okrs > 0 {
        let _ = write!(out, " okrs={okrs}");
    }
    out.push('\n');
    if let Some(reports) = children.get(id) {
        for &child in reports {
            walk(oag, children, child, depth + 1, visited, out);
        }
    }
}

/// Tasks in order with assignee and prerequisite numbers.
pub fn render_tasks(oag: &Oag) -> String {
    let tasks = oag.get_tasks();
    let number: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i + 1))
        .collect();
    let mut prerequisites: HashMap<&str, Vec<usize>> = HashMap::new();
    for edge in oag.dependency_edges() {
        if let Some(&n) = number.get(edge.from_id.as_str()) {
            prerequisites.entry(edge.to_id.as_str()).or_default().push(n);
        }
    }

    let mut out = String::new();
    for (i, task) in tasks.iter().enumerate() {
        let owner = oag
            .agent(&task.agent_id)
            .map(|a| a.role.as_str())
            .unwrap_or("<unassigned>");
        let _ = write!(out, "  {}. {} -> {} [{}]", i + 1, task.description, owner, task.status);
        if let Some(deps) = prerequisites.get(task.id.as_str()) {
            let list: Vec<String> = deps.iter().map(|n| format!("#{n}")).collect();
            let _ = write!(out, " after {}", list.join(", "));
        }
        out.push('\n');
    }
    out
}
