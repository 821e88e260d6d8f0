use std::collections::HashSet;

use super::types::{ChildStatus, ChildTask};
use crate::traits::ProviderChild;

/// Build the internal child list from provider data and classify it once.
///
/// Source "closed" maps to completed, "in_progress" stays in progress; every
/// other child becomes blocked or ready depending on its in-epic dependencies.
pub fn classify_initial(source: &[ProviderChild]) -> Vec<ChildTask> {
    let mut children: Vec<ChildTask> = source
        .iter()
        .map(|c| ChildTask {
            id: c.id.clone(),
            title: c.title.clone(),
            priority: c.priority,
            status: initial_status(&c.status),
            assignee: c.assignee.clone(),
            depends_on: c.blocked_by.clone(),
            agent_id: None,
            session_id: None,
        })
        .collect();

    recompute_readiness(&mut children);
    children
}

fn initial_status(source_status: &str) -> ChildStatus {
    match source_status.trim().to_ascii_lowercase().as_str() {
        "closed" | "completed" | "done" => ChildStatus::Completed,
        "in_progress" | "in-progress" => ChildStatus::InProgress,
        _ => ChildStatus::Pending,
    }
}

/// Re-run the blocked/ready rule over every unsettled child.
///
/// Edges pointing outside the epic count as satisfied. A dependency cycle
/// leaves its members blocked for good.
pub fn recompute_readiness(children: &mut [ChildTask]) {
    let in_epic: HashSet<String> = children.iter().map(|c| c.id.clone()).collect();
    let completed: HashSet<String> = children
        .iter()
        .filter(|c| c.status == ChildStatus::Completed)
        .map(|c| c.id.clone())
        .collect();

    for child in children.iter_mut() {
        if child.status.is_settled() {
            continue;
        }

        let waiting = child
            .depends_on
            .iter()
            .any(|dep| in_epic.contains(dep) && !completed.contains(dep));

        child.status = if waiting {
            ChildStatus::Blocked
        } else {
            ChildStatus::Ready
        };
    }
}

/// Ready children ordered by priority; ties keep list order.
pub fn ready_by_priority(children: &[ChildTask]) -> Vec<&ChildTask> {
    let mut ready: Vec<&ChildTask> = children
        .iter()
        .filter(|c| c.status == ChildStatus::Ready)
        .collect();
    // sort_by_key is stable
    ready.sort_by_key(|c| c.priority);
    ready
}

pub fn ids_with_status(children: &[ChildTask], status: ChildStatus) -> HashSet<String> {
    children
        .iter()
        .filter(|c| c.status == status)
        .map(|c| c.id.clone())
        .collect()
}
