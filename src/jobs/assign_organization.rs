//! Tag facilities and their dependent collection tables with an
//! organization_id. The WHERE guard means an id, once set, is never
//! overwritten; reruns are no-ops for already-tagged rows.

use crate::error::Result;
use crate::wrangler::{self, escape_literal};
use tracing::info;

const DEPENDENT_TABLES: &[&str] = &[
    "facility_services",
    "facility_tests",
    "facility_qualifications",
    "facility_staff_lookup",
];

pub fn build_statements(organization_id: &str, where_clause: Option<&str>) -> Vec<String> {
    let org_literal = escape_literal(organization_id);
    let extra = where_clause
        .filter(|clause| !clause.trim().is_empty())
        .map(|clause| format!(" AND ({clause})"))
        .unwrap_or_default();

    let mut statements = vec![format!(
        "UPDATE facilities\n  SET organization_id = '{org_literal}'\n  WHERE (organization_id IS NULL OR organization_id = ''){extra};"
    )];
    for table in DEPENDENT_TABLES {
        statements.push(format!(
            "UPDATE {table}\n  SET organization_id = '{org_literal}'\n  WHERE (organization_id IS NULL OR organization_id = '')\n    AND facility_id IN (SELECT id FROM facilities WHERE organization_id = '{org_literal}');"
        ));
    }
    statements
}

pub async fn run(
    db_binding: &str,
    organization_id: &str,
    where_clause: Option<&str>,
    remote: bool,
    dry_run: bool,
) -> Result<()> {
    let statements = build_statements(organization_id, where_clause);

    if dry_run {
        println!("[dry-run] Statements:");
        for statement in &statements {
            println!("{statement}\n---");
        }
        return Ok(());
    }

    println!(
        "[info] Assigning organization_id='{organization_id}' (where='{}')",
        where_clause.unwrap_or("organization_id IS NULL")
    );
    for statement in &statements {
        wrangler::d1_execute(db_binding, statement, remote).await?;
    }
    info!("organization assignment completed for {organization_id}");
    println!("[info] Completed organization assignment.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_statement_per_table() {
        let statements = build_statements("organization:nakano-med", None);
        assert_eq!(statements.len(), 5);
        assert!(statements[0].contains("UPDATE facilities"));
        assert!(statements[1].contains("facility_services"));
        assert!(statements[4].contains("facility_staff_lookup"));
    }

    #[test]
    fn guard_protects_existing_assignments() {
        for statement in build_statements("organization:nakano-med", None) {
            assert!(statement.contains("organization_id IS NULL OR organization_id = ''"));
        }
    }

    #[test]
    fn where_clause_is_appended_to_facilities_only() {
        let statements = build_statements("org", Some("name LIKE '%中野%'"));
        assert!(statements[0].contains("AND (name LIKE '%中野%')"));
        assert!(!statements[1].contains("中野"));
    }

    #[test]
    fn organization_literal_is_escaped() {
        let statements = build_statements("o'brien", None);
        assert!(statements[0].contains("'o''brien'"));
    }
}
