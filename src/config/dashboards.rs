//! Built-in dashboard definitions.

use std::time::Duration;

use crate::models::bulk::{BulkAction, HttpVerb};
use crate::models::dashboard::DashboardSpec;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn club_memberships() -> DashboardSpec {
    let mut spec = DashboardSpec::new(
        "club_memberships",
        "Club Memberships",
        "club_members",
        10,
    );
    spec.search_fields = strings(&["name", "email", "mobile"]);
    spec.rows_key = Some("club_members".to_string());
    spec.columns = strings(&["id", "name", "email", "mobile", "status"]);
    spec.empty_message = "No members found".to_string();
    spec.statuses = strings(&["active", "inactive", "suspended"]);
    spec
}

pub fn occupant_users() -> DashboardSpec {
    let mut spec = DashboardSpec::new("occupant_users", "Occupant Users", "occupant_users", 20);
    spec.search_fields = strings(&["firstname", "lastname", "email", "mobile"]);
    spec.rows_key = Some("users".to_string());
    spec.columns = strings(&["id", "firstname", "lastname", "email", "status"]);
    spec.empty_message = "No users found".to_string();
    spec.debounce = Some(Duration::from_millis(500));
    spec.statuses = strings(&["approved", "pending", "rejected"]);
    spec
}

pub fn loyalty_tiers() -> DashboardSpec {
    let mut spec = DashboardSpec::new("loyalty_tiers", "Loyalty Tiers", "loyalty_tiers", 10);
    spec.search_fields = strings(&["name"]);
    spec.rows_key = Some("loyalty_tiers".to_string());
    spec.columns = strings(&["id", "name", "point_range_from", "point_range_to"]);
    spec.empty_message = "No tiers found".to_string();
    spec.debounce = Some(Duration::from_millis(300));
    spec
}

pub fn task_occurrences() -> DashboardSpec {
    let mut spec = DashboardSpec::new(
        "task_occurrences",
        "Checklist Tasks",
        "task_occurrences",
        20,
    );
    spec.search_fields = strings(&["checklist_name", "asset_name"]);
    spec.rows_key = Some("task_occurrences".to_string());
    spec.columns = strings(&["id", "checklist_name", "asset_name", "start_date", "status"]);
    spec.empty_message = "No tasks found".to_string();
    spec.bulk_actions = vec![
        BulkAction::new(
            "reschedule",
            "task_occurrences/bulk_reschedule.json",
            "task_occurrence_ids",
        )
        .wording("rescheduled", "task"),
        BulkAction::new(
            "reassign",
            "task_occurrences/bulk_reassign.json",
            "task_occurrence_ids",
        )
        .verb(HttpVerb::Patch)
        .wording("reassigned", "task"),
    ];
    spec.statuses = strings(&["open", "in_progress", "closed", "skipped"]);
    spec
}

pub fn assets() -> DashboardSpec {
    let mut spec = DashboardSpec::new("assets", "Assets", "pms/assets", 20);
    spec.search_fields = strings(&["name", "asset_number"]);
    spec.rows_key = Some("assets".to_string());
    spec.count_aliases = strings(&["total_assets", "total_assets_count"]);
    spec.columns = strings(&["id", "name", "asset_number", "breakdown"]);
    spec.empty_message = "No assets found".to_string();
    spec.statuses = strings(&["in_use", "breakdown"]);
    spec
}

pub fn all() -> Vec<DashboardSpec> {
    vec![
        club_memberships(),
        occupant_users(),
        loyalty_tiers(),
        task_occurrences(),
        assets(),
    ]
}

pub fn find(name: &str) -> Option<DashboardSpec> {
    all().into_iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique() {
        let specs = all();
        let mut names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), specs.len());
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find("loyalty_tiers").unwrap().empty_message, "No tiers found");
        assert!(find("nope").is_none());
    }

    #[test]
    fn task_dashboard_exposes_bulk_actions() {
        let spec = task_occurrences();
        let reassign = spec.bulk_action("reassign").unwrap();
        assert_eq!(reassign.verb, HttpVerb::Patch);
        assert_eq!(reassign.ids_field, "task_occurrence_ids");
        assert!(spec.bulk_action("delete").is_none());
    }
}
