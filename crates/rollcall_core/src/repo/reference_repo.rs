//! Reference-data repository (people, sites, partners, parameters, users,
//! interest-group membership).
//!
//! # Responsibility
//! - Replace reference tables wholesale during cold load.
//! - Serve read-only lookups used by form contexts and views.
//!
//! # Invariants
//! - `replace` clears and refills a table in one transaction.
//! - Reference rows never carry sync state.

use crate::db::LocalStore;
use crate::model::{GroupMember, Parameter, Partner, Person, Site, User};
use crate::repo::entity_repo::{parse_bool_column, RepoResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Params, Row};

const SITE_ID_SEPARATOR: char = '\u{1f}';

/// Table binding for one reference record type.
pub trait ReferenceRecord: Sized {
    const TABLE: &'static str;
    /// Projection used by every read; filters are appended as `WHERE`.
    const SELECT: &'static str;
    const ORDER_BY: &'static str;

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
    fn upsert(&self, conn: &Connection) -> RepoResult<()>;

    fn clear(conn: &Connection) -> RepoResult<()> {
        conn.execute(&format!("DELETE FROM {};", Self::TABLE), [])?;
        Ok(())
    }
}

impl ReferenceRecord for Person {
    const TABLE: &'static str = "people";
    const SELECT: &'static str =
        "SELECT id, document_number, first_name, last_name FROM people";
    const ORDER_BY: &'static str = "first_name ASC, last_name ASC, id ASC";

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            document_number: row.get("document_number")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO people (id, document_number, first_name, last_name)
             VALUES (?1, ?2, ?3, ?4);",
            params![self.id, self.document_number, self.first_name, self.last_name],
        )?;
        Ok(())
    }
}

impl ReferenceRecord for Site {
    const TABLE: &'static str = "sites";
    const SELECT: &'static str = "SELECT id, name FROM sites";
    const ORDER_BY: &'static str = "name ASC, id ASC";

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO sites (id, name) VALUES (?1, ?2);",
            params![self.id, self.name],
        )?;
        Ok(())
    }
}

impl ReferenceRecord for Partner {
    const TABLE: &'static str = "partners";
    const SELECT: &'static str = "SELECT id, name FROM partners";
    const ORDER_BY: &'static str = "name ASC, id ASC";

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO partners (id, name) VALUES (?1, ?2);",
            params![self.id, self.name],
        )?;
        Ok(())
    }
}

impl ReferenceRecord for Parameter {
    const TABLE: &'static str = "parameters";
    const SELECT: &'static str = "SELECT id, set_id, name, requires_photo FROM parameters";
    const ORDER_BY: &'static str = "set_id ASC, name ASC, id ASC";

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            set_id: row.get("set_id")?,
            name: row.get("name")?,
            requires_photo: parse_bool_column(row, Self::TABLE, "requires_photo")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO parameters (id, set_id, name, requires_photo)
             VALUES (?1, ?2, ?3, ?4);",
            params![self.id, self.set_id, self.name, self.requires_photo],
        )?;
        Ok(())
    }
}

impl ReferenceRecord for User {
    const TABLE: &'static str = "users";
    const SELECT: &'static str = "SELECT
            id,
            display_name,
            (SELECT GROUP_CONCAT(site_id, char(31))
             FROM user_sites
             WHERE user_sites.user_id = users.id) AS site_ids
        FROM users";
    const ORDER_BY: &'static str = "display_name ASC, id ASC";

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let joined: Option<String> = row.get("site_ids")?;
        let mut site_ids = joined
            .map(|value| {
                value
                    .split(SITE_ID_SEPARATOR)
                    .filter(|site| !site.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        site_ids.sort();

        Ok(Self {
            id: row.get("id")?,
            display_name: row.get("display_name")?,
            site_ids,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute("DELETE FROM user_sites WHERE user_id = ?1;", [&self.id])?;
        conn.execute(
            "INSERT OR REPLACE INTO users (id, display_name) VALUES (?1, ?2);",
            params![self.id, self.display_name],
        )?;
        for site_id in &self.site_ids {
            conn.execute(
                "INSERT OR IGNORE INTO user_sites (user_id, site_id) VALUES (?1, ?2);",
                params![self.id, site_id],
            )?;
        }
        Ok(())
    }

    fn clear(conn: &Connection) -> RepoResult<()> {
        conn.execute_batch("DELETE FROM user_sites; DELETE FROM users;")?;
        Ok(())
    }
}

impl ReferenceRecord for GroupMember {
    const TABLE: &'static str = "group_members";
    const SELECT: &'static str = "SELECT group_id, person_id FROM group_members";
    const ORDER_BY: &'static str = "group_id ASC, person_id ASC";

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            group_id: row.get("group_id")?,
            person_id: row.get("person_id")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, person_id) VALUES (?1, ?2);",
            params![self.group_id, self.person_id],
        )?;
        Ok(())
    }
}

/// SQLite-backed repository for every reference table.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    store: LocalStore,
}

impl ReferenceRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Clears the table and inserts `records` in one transaction.
    pub fn replace<R: ReferenceRecord>(&self, records: &[R]) -> RepoResult<usize> {
        let count = self.store.with_tx(|tx| -> RepoResult<usize> {
            R::clear(tx)?;
            for record in records {
                record.upsert(tx)?;
            }
            Ok(records.len())
        })?;
        debug!(
            "event=reference_replace module=repo status=ok table={} count={}",
            R::TABLE,
            count
        );
        Ok(count)
    }

    /// Adds `records` without clearing, used for follow-up cold-load pages.
    pub fn append<R: ReferenceRecord>(&self, records: &[R]) -> RepoResult<usize> {
        self.store.with_tx(|tx| {
            for record in records {
                record.upsert(tx)?;
            }
            Ok(records.len())
        })
    }

    pub fn all<R: ReferenceRecord>(&self) -> RepoResult<Vec<R>> {
        self.store
            .with_conn(|conn| query_reference::<R, _>(conn, "1 = 1", params![]))
    }

    pub fn person(&self, id: &str) -> RepoResult<Option<Person>> {
        self.store.with_conn(|conn| {
            let mut people = query_reference::<Person, _>(conn, "id = ?1", [id])?;
            Ok(people.pop())
        })
    }

    /// People belonging to one beneficiary interest group.
    pub fn people_in_group(&self, group_id: &str) -> RepoResult<Vec<Person>> {
        self.store.with_conn(|conn| {
            query_reference::<Person, _>(
                conn,
                "id IN (SELECT person_id FROM group_members WHERE group_id = ?1)",
                [group_id],
            )
        })
    }

    pub fn user(&self, id: &str) -> RepoResult<Option<User>> {
        self.store.with_conn(|conn| {
            let mut users = query_reference::<User, _>(conn, "id = ?1", [id])?;
            Ok(users.pop())
        })
    }

    /// Sites assigned to a user; empty when the user is unrestricted or unknown.
    pub fn user_site_ids(&self, user_id: &str) -> RepoResult<Vec<String>> {
        self.store.with_conn(|conn| assigned_site_ids(conn, user_id))
    }

    /// Sites visible to a user: the assigned ones, or all when unrestricted.
    pub fn sites_for_user(&self, user_id: &str) -> RepoResult<Vec<Site>> {
        let site_ids = self.user_site_ids(user_id)?;
        if site_ids.is_empty() {
            return self.all::<Site>();
        }
        self.store
            .with_conn(|conn| query_in::<Site>(conn, "id", &site_ids))
    }

    /// Users assigned to any of `site_ids`; all users when `site_ids` is empty.
    pub fn users_for_sites(&self, site_ids: &[String]) -> RepoResult<Vec<User>> {
        if site_ids.is_empty() {
            return self.all::<User>();
        }
        self.store.with_conn(|conn| {
            let placeholders = placeholders(site_ids.len());
            query_reference::<User, _>(
                conn,
                &format!(
                    "id IN (SELECT user_id FROM user_sites WHERE site_id IN ({placeholders}))"
                ),
                params_from_iter(site_ids.iter()),
            )
        })
    }

    pub fn parameters_in_set(&self, set_id: &str) -> RepoResult<Vec<Parameter>> {
        self.store
            .with_conn(|conn| query_reference::<Parameter, _>(conn, "set_id = ?1", [set_id]))
    }

    pub fn parameter(&self, id: &str) -> RepoResult<Option<Parameter>> {
        self.store.with_conn(|conn| {
            let mut parameters = query_reference::<Parameter, _>(conn, "id = ?1", [id])?;
            Ok(parameters.pop())
        })
    }
}

pub(crate) fn assigned_site_ids(conn: &Connection, user_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT site_id
         FROM user_sites
         WHERE user_id = ?1
         ORDER BY site_id ASC;",
    )?;
    let ids = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn query_reference<R: ReferenceRecord, P: Params>(
    conn: &Connection,
    where_clause: &str,
    params: P,
) -> RepoResult<Vec<R>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE {where_clause} ORDER BY {};",
        R::SELECT,
        R::ORDER_BY
    ))?;
    let mut rows = stmt.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(R::from_row(row)?);
    }
    Ok(records)
}

fn query_in<R: ReferenceRecord>(
    conn: &Connection,
    column: &str,
    values: &[String],
) -> RepoResult<Vec<R>> {
    let bind_values = values
        .iter()
        .map(|value| Value::Text(value.clone()))
        .collect::<Vec<_>>();
    query_reference::<R, _>(
        conn,
        &format!("{column} IN ({})", placeholders(values.len())),
        params_from_iter(bind_values),
    )
}

pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}
