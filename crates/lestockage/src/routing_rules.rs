//! Persisted routing rules
//!
//! Rules are stored with a priority, a JSON condition document and a
//! target team. The router runs its built-in rule set and does not read
//! these rows.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored routing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRuleRecord {
    /// Rule identifier
    pub id: String,
    /// Display name
    pub rule_name: String,
    /// Evaluation priority, lower first
    pub priority: i64,
    /// Match conditions as a JSON object
    pub conditions: serde_json::Value,
    /// Team assigned when the rule matches
    pub assigned_team: String,
    /// Inactive rules are kept but skipped
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl RoutingRuleRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let conditions: String = row.get("conditions")?;
        let conditions = serde_json::from_str(&conditions).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            rule_name: row.get("rule_name")?,
            priority: row.get("priority")?,
            conditions,
            assigned_team: row.get("assigned_team")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Routing rule store
pub struct RoutingRuleStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoutingRuleStore<'a> {
    /// Create a new routing rule store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a rule
    pub fn insert(
        &self,
        rule_name: &str,
        priority: i64,
        conditions: &serde_json::Value,
        assigned_team: &str,
        is_active: bool,
    ) -> Result<RoutingRuleRecord> {
        let record = RoutingRuleRecord {
            id: Uuid::new_v4().to_string(),
            rule_name: rule_name.to_string(),
            priority,
            conditions: conditions.clone(),
            assigned_team: assigned_team.to_string(),
            is_active,
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO routing_rules (id, rule_name, priority, conditions, assigned_team, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.rule_name,
                record.priority,
                serde_json::to_string(&record.conditions)?,
                record.assigned_team,
                record.is_active,
                record.created_at,
            ],
        )?;

        Ok(record)
    }

    /// Active rules in evaluation order
    pub fn list_active(&self) -> Result<Vec<RoutingRuleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, rule_name, priority, conditions, assigned_team, is_active, created_at
             FROM routing_rules WHERE is_active = 1
             ORDER BY priority ASC, created_at ASC",
        )?;

        let rules = stmt
            .query_map([], RoutingRuleRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Storage;
    use serde_json::json;

    #[test]
    fn test_list_active_ordered_by_priority() {
        let storage = Storage::open_in_memory().unwrap();
        let rules = RoutingRuleStore::new(storage.conn());

        rules
            .insert("enterprise", 30, &json!({"companySize": "Enterprise"}), "Accounts", true)
            .unwrap();
        rules
            .insert("international", 10, &json!({"region": "International"}), "Sales", true)
            .unwrap();
        rules
            .insert("retired", 5, &json!({}), "Legacy", false)
            .unwrap();

        let active = rules.list_active().unwrap();
        let names: Vec<_> = active.iter().map(|r| r.rule_name.as_str()).collect();
        assert_eq!(names, ["international", "enterprise"]);
        assert_eq!(active[0].conditions["region"], "International");
    }
}
