use anyhow::Result;
use libsql::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::catalog::Catalog;
use crate::model::{LinkGroupInput, LinkInput};

/// Portable snapshot of the whole catalog. Identifiers are kept for
/// reference, timestamps are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default)]
    pub link_groups: Vec<ExportGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportGroup {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub links: Vec<ExportLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportLink {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub group_id: i64,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl ExportDocument {
    /// Structural checks done before any write, so a bad document is a 400
    /// and never reaches the transaction.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (i, group) in self.link_groups.iter().enumerate() {
            if group.name.trim().is_empty() {
                return Err(format!("link_groups[{i}]: name is required"));
            }
            for (j, link) in group.links.iter().enumerate() {
                if link.name.trim().is_empty() || link.url.trim().is_empty() {
                    return Err(format!("link_groups[{i}].links[{j}]: name and url are required"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub groups_created: usize,
    pub groups_replaced: usize,
    pub links_imported: usize,
    /// Document group id -> id the group has in this catalog.
    pub group_ids: BTreeMap<i64, i64>,
}

pub struct Transfer<'a> {
    conn: &'a Connection,
}

impl<'a> Transfer<'a> {
    /// The connection must not be shared with other callers: `import` runs
    /// a transaction on it.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Reads groups and links inside one read transaction, so the document
    /// is a consistent snapshot even while other connections write.
    pub async fn export(&self) -> Result<ExportDocument> {
        self.conn.execute("BEGIN", ()).await?;

        let groups = match Catalog::new(self.conn).list_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                if let Err(rollback) = self.conn.execute("ROLLBACK", ()).await {
                    tracing::error!("failed to end export snapshot: {}", rollback);
                }
                return Err(e);
            }
        };
        self.conn.execute("COMMIT", ()).await?;

        let link_groups = groups
            .into_iter()
            .map(|group| ExportGroup {
                id: group.id,
                name: group.name,
                sort_order: group.sort_order,
                links: group
                    .links
                    .into_iter()
                    .map(|link| ExportLink {
                        id: link.id,
                        group_id: link.group_id,
                        name: link.name,
                        url: link.url,
                        icon: link.icon,
                        sort_order: link.sort_order,
                    })
                    .collect(),
            })
            .collect();

        Ok(ExportDocument { link_groups })
    }

    /// Merges `doc` into the catalog, all or nothing.
    ///
    /// A group whose name already exists keeps its id, takes the incoming
    /// sort order, and has its links replaced by the incoming ones. Other
    /// groups are created. Links always get fresh ids.
    pub async fn import(&self, doc: &ExportDocument) -> Result<ImportSummary> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;

        let result = self.import_internal(doc).await;

        match result {
            Ok(summary) => {
                if let Err(e) = self.conn.execute("COMMIT", ()).await {
                    let _ = self.conn.execute("ROLLBACK", ()).await;
                    return Err(e.into());
                }
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute("ROLLBACK", ()).await {
                    tracing::error!("failed to roll back import: {}", rollback);
                }
                Err(e)
            }
        }
    }

    async fn import_internal(&self, doc: &ExportDocument) -> Result<ImportSummary> {
        let catalog = Catalog::new(self.conn);
        let mut by_name = self.group_ids_by_name().await?;
        // Groups already cleared or created by this import. A name repeated
        // inside one document appends to the group instead of wiping it again.
        let mut touched: HashSet<i64> = HashSet::new();
        let mut summary = ImportSummary::default();

        for group in &doc.link_groups {
            let input = LinkGroupInput {
                name: group.name.clone(),
                sort_order: group.sort_order,
            };

            let group_id = match by_name.get(&group.name) {
                Some(&existing) => {
                    if !catalog.update_group(existing, &input).await? {
                        anyhow::bail!("group {} vanished during import", existing);
                    }
                    if touched.insert(existing) {
                        let removed = catalog.clear_group(existing).await?;
                        tracing::debug!(group_id = existing, removed, "replacing links of existing group");
                        summary.groups_replaced += 1;
                    }
                    existing
                }
                None => {
                    let created = catalog.create_group(&input).await?;
                    by_name.insert(group.name.clone(), created);
                    touched.insert(created);
                    summary.groups_created += 1;
                    created
                }
            };
            summary.group_ids.insert(group.id, group_id);

            for link in &group.links {
                let input = LinkInput {
                    group_id,
                    name: link.name.clone(),
                    url: link.url.clone(),
                    icon: link.icon.clone(),
                    sort_order: link.sort_order,
                };
                if catalog.create_link(&input).await?.is_none() {
                    anyhow::bail!("group {} missing while importing links", group_id);
                }
                summary.links_imported += 1;
            }
        }

        Ok(summary)
    }

    /// First group by id wins when the catalog already holds duplicate names.
    async fn group_ids_by_name(&self) -> Result<HashMap<String, i64>> {
        let mut rows = self
            .conn
            .query("SELECT id, name FROM link_groups ORDER BY id ASC", ())
            .await?;
        let mut by_name = HashMap::new();

        while let Some(row) = rows.next().await? {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            by_name.entry(name).or_insert(id);
        }

        Ok(by_name)
    }
}
