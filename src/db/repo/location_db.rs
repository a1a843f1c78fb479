use crate::db::error::DbError;
use crate::db::repo::location::{LocationRepo, Subtree};
use crate::db::repo::{Assignments, GEAR_SELECT};
use crate::db::{Db, DbResult, like_pattern, map_row_opt, map_rows};
use crate::models::gear::Gear;
use crate::models::location::{Location, LocationFilter, LocationPatch, NewLocation};
use crate::models::patch::Patch;
use crate::models::types::LocationId;
use std::sync::Arc;
use tokio_postgres::IsolationLevel;
use tokio_postgres::types::ToSql;

const LOCATION_COLUMNS: &str = "id, name, type, parent_id";

pub struct LocationRepository {
    db: Arc<Db>,
}

impl LocationRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl LocationRepo for LocationRepository {
    async fn insert(&self, new: &NewLocation) -> DbResult<Location> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                INSERT INTO locations (name, type, parent_id)
                VALUES ($1, $2, $3)
                RETURNING id, name, type, parent_id
                "#,
            )
            .await?;

        let row = client
            .query_one(&stmt, &[&new.name, &new.kind, &new.parent_id])
            .await?;
        Location::try_from_row(&row)
    }

    async fn get(&self, id: LocationId) -> DbResult<Option<Location>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"))
            .await?;

        let row_opt = client.query_opt(&stmt, &[&id]).await?;
        map_row_opt(row_opt, Location::try_from_row, &format!("LocationRepo::get id={}", id))
    }

    async fn list(&self, filter: &LocationFilter) -> DbResult<Vec<Location>> {
        let client = self.db.get_client().await?;

        let name_pattern = filter.name.as_deref().map(like_pattern);
        let rows = client
            .query(
                &format!(
                    r#"
                    SELECT {LOCATION_COLUMNS} FROM locations
                    WHERE ($1::text IS NULL OR name ILIKE $1)
                      AND ($2::text IS NULL OR type = $2)
                    ORDER BY id
                    "#
                ),
                &[&name_pattern, &filter.kind],
            )
            .await?;

        map_rows(&rows, Location::try_from_row, "LocationRepo::list")
    }

    async fn update(&self, id: LocationId, patch: LocationPatch) -> DbResult<Option<Location>> {
        let mut client = self.db.get_client().await?;
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let exists = tx
            .query_opt("SELECT id FROM locations WHERE id = $1 FOR UPDATE", &[&id])
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let LocationPatch { name, kind, parent_id } = patch;
        if let Patch::Set(Some(parent_id)) = parent_id {
            let loops: bool = tx
                .query_one(
                    r#"
                    WITH RECURSIVE chain(id, parent_id) AS (
                        SELECT id, parent_id FROM locations WHERE id = $1
                        UNION
                        SELECT l.id, l.parent_id FROM locations l JOIN chain c ON l.id = c.parent_id
                    )
                    SELECT EXISTS (SELECT 1 FROM chain WHERE id = $2)
                    "#,
                    &[&parent_id, &id],
                )
                .await?
                .try_get(0)?;
            if loops {
                return Err(DbError::Cycle { id, parent_id });
            }
        }

        let mut set = Assignments::default();
        if let Patch::Set(v) = name {
            set.push("name", v);
        }
        if let Patch::Set(v) = kind {
            set.push("type", v);
        }
        if let Patch::Set(v) = parent_id {
            set.push("parent_id", v);
        }

        if !set.is_empty() {
            let sql = format!(
                "UPDATE locations SET {} WHERE id = {}",
                set.set_clause(),
                set.id_placeholder()
            );
            tx.execute(&sql, &set.params(&id)).await?;
        }

        let row = tx
            .query_one(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"), &[&id])
            .await?;
        let location = Location::try_from_row(&row)?;

        tx.commit().await?;
        Ok(Some(location))
    }

    async fn delete(&self, id: LocationId) -> DbResult<bool> {
        let mut client = self.db.get_client().await?;
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let exists = tx
            .query_opt("SELECT id FROM locations WHERE id = $1 FOR UPDATE", &[&id])
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let children = tx
            .execute("UPDATE locations SET parent_id = NULL WHERE parent_id = $1", &[&id])
            .await?;
        let items = tx
            .execute("UPDATE gear SET location_id = NULL WHERE location_id = $1", &[&id])
            .await?;
        tx.execute("DELETE FROM locations WHERE id = $1", &[&id]).await?;

        tx.commit().await?;
        tracing::debug!(%id, children, items, "location deleted, dependents detached");
        Ok(true)
    }

    async fn subtree(&self, id: LocationId) -> DbResult<Option<Subtree>> {
        let mut client = self.db.get_client().await?;
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only(true)
            .start()
            .await?;

        // depth orders the root first and parents before their children
        let rows = tx
            .query(
                r#"
                WITH RECURSIVE tree(id, name, type, parent_id, depth) AS (
                    SELECT id, name, type, parent_id, 0 FROM locations WHERE id = $1
                    UNION
                    SELECT l.id, l.name, l.type, l.parent_id, t.depth + 1
                    FROM locations l JOIN tree t ON l.parent_id = t.id
                    WHERE t.depth < 1000
                )
                SELECT DISTINCT ON (id) id, name, type, parent_id, depth
                FROM tree
                ORDER BY id, depth
                "#,
                &[&id],
            )
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut ranked = rows
            .iter()
            .map(|r| -> DbResult<(i32, Location)> { Ok((r.try_get("depth")?, Location::try_from_row(r)?)) })
            .collect::<DbResult<Vec<_>>>()?;
        ranked.sort_by_key(|(depth, loc)| (*depth, loc.id));
        let locations: Vec<Location> = ranked.into_iter().map(|(_, loc)| loc).collect();

        let ids: Vec<i64> = locations.iter().map(|l| l.id.get()).collect();
        let params: [&(dyn ToSql + Sync); 1] = [&ids];
        let gear_rows = tx
            .query(
                &format!("{GEAR_SELECT} WHERE g.location_id = ANY($1) ORDER BY g.id"),
                &params,
            )
            .await?;
        let gear = map_rows(&gear_rows, Gear::try_from_row, "LocationRepo::subtree")?;

        tx.commit().await?;
        Ok(Some(Subtree { locations, gear }))
    }
}
