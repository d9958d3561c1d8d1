use anyhow::Result;
use libsql::Connection;
use std::collections::HashMap;

use crate::model::{Link, LinkGroup, LinkGroupInput, LinkInput};

const GROUP_COLUMNS: &str = "id, name, sort_order, created_at, updated_at";
const LINK_COLUMNS: &str = "id, group_id, name, url, icon, sort_order, created_at, updated_at";

pub struct Catalog<'a> {
    conn: &'a Connection,
}

impl<'a> Catalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Every group with its links, both ordered by `sort_order`. Ties fall
    /// back to insertion order.
    pub async fn list_groups(&self) -> Result<Vec<LinkGroup>> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM link_groups ORDER BY sort_order ASC, id ASC");
        let mut rows = self.conn.query(&query, ()).await?;
        let mut groups = Vec::new();

        while let Some(row) = rows.next().await? {
            groups.push(Self::row_to_group(&row)?);
        }

        let query = format!("SELECT {LINK_COLUMNS} FROM links ORDER BY group_id, sort_order ASC, id ASC");
        let mut rows = self.conn.query(&query, ()).await?;
        let mut links_by_group: HashMap<i64, Vec<Link>> = HashMap::new();

        while let Some(row) = rows.next().await? {
            let link = Self::row_to_link(&row)?;
            links_by_group.entry(link.group_id).or_default().push(link);
        }

        for group in &mut groups {
            group.links = links_by_group.remove(&group.id).unwrap_or_default();
        }

        Ok(groups)
    }

    #[cfg(test)]
    pub(crate) async fn get_group(&self, id: i64) -> Result<Option<LinkGroup>> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM link_groups WHERE id = ?");
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        let mut group = match rows.next().await? {
            Some(row) => Self::row_to_group(&row)?,
            None => return Ok(None),
        };
        group.links = self.links_for(id).await?;

        Ok(Some(group))
    }

    pub async fn group_exists(&self, id: i64) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM link_groups WHERE id = ?", libsql::params![id])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    pub async fn create_group(&self, input: &LinkGroupInput) -> Result<i64> {
        let query = r#"
            INSERT INTO link_groups (name, sort_order)
            VALUES (?, ?)
            RETURNING id
        "#;

        let mut rows = self
            .conn
            .query(query, libsql::params![input.name.as_str(), input.sort_order])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(row.get(0)?)
        } else {
            anyhow::bail!("Failed to create link group")
        }
    }

    pub async fn update_group(&self, id: i64, input: &LinkGroupInput) -> Result<bool> {
        let query = r#"
            UPDATE link_groups
            SET name = ?, sort_order = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
        "#;

        let updated = self
            .conn
            .execute(query, libsql::params![input.name.as_str(), input.sort_order, id])
            .await?;
        Ok(updated > 0)
    }

    /// Deletes the group; its links go with it through the foreign key.
    pub async fn delete_group(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM link_groups WHERE id = ?", libsql::params![id])
            .await?;
        Ok(deleted > 0)
    }

    pub async fn clear_group(&self, group_id: i64) -> Result<u64> {
        Ok(self
            .conn
            .execute("DELETE FROM links WHERE group_id = ?", libsql::params![group_id])
            .await?)
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// `None` when the group does not exist.
    pub async fn list_links(&self, group_id: i64) -> Result<Option<Vec<Link>>> {
        if !self.group_exists(group_id).await? {
            return Ok(None);
        }
        Ok(Some(self.links_for(group_id).await?))
    }

    async fn links_for(&self, group_id: i64) -> Result<Vec<Link>> {
        let query = format!("SELECT {LINK_COLUMNS} FROM links WHERE group_id = ? ORDER BY sort_order ASC, id ASC");
        let mut rows = self.conn.query(&query, libsql::params![group_id]).await?;
        let mut links = Vec::new();

        while let Some(row) = rows.next().await? {
            links.push(Self::row_to_link(&row)?);
        }

        Ok(links)
    }

    #[cfg(test)]
    pub(crate) async fn get_link(&self, id: i64) -> Result<Option<Link>> {
        let query = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?");
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_link(&row)?))
        } else {
            Ok(None)
        }
    }

    /// `None` when the target group does not exist.
    pub async fn create_link(&self, input: &LinkInput) -> Result<Option<i64>> {
        if !self.group_exists(input.group_id).await? {
            return Ok(None);
        }

        let query = r#"
            INSERT INTO links (group_id, name, url, icon, sort_order)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#;

        let mut rows = self
            .conn
            .query(
                query,
                libsql::params![
                    input.group_id,
                    input.name.as_str(),
                    input.url.as_str(),
                    input.icon.clone(),
                    input.sort_order
                ],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get(0)?))
        } else {
            anyhow::bail!("Failed to create link")
        }
    }

    /// May move the link to another group; the caller checks that group
    /// exists so a missing one can be reported separately.
    pub async fn update_link(&self, id: i64, input: &LinkInput) -> Result<bool> {
        let query = r#"
            UPDATE links
            SET group_id = ?, name = ?, url = ?, icon = ?, sort_order = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
        "#;

        let updated = self
            .conn
            .execute(
                query,
                libsql::params![
                    input.group_id,
                    input.name.as_str(),
                    input.url.as_str(),
                    input.icon.clone(),
                    input.sort_order,
                    id
                ],
            )
            .await?;
        Ok(updated > 0)
    }

    pub async fn delete_link(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM links WHERE id = ?", libsql::params![id])
            .await?;
        Ok(deleted > 0)
    }

    fn row_to_group(row: &libsql::Row) -> Result<LinkGroup> {
        Ok(LinkGroup {
            id: row.get(0)?,
            name: row.get(1)?,
            sort_order: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            links: Vec::new(),
        })
    }

    fn row_to_link(row: &libsql::Row) -> Result<Link> {
        Ok(Link {
            id: row.get(0)?,
            group_id: row.get(1)?,
            name: row.get(2)?,
            url: row.get(3)?,
            icon: row.get(4)?,
            sort_order: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}
