use crate::db::repo::gear::GearRepo;
use crate::db::repo::{Assignments, GEAR_SELECT};
use crate::db::{Db, DbResult, like_pattern, map_row_opt, map_rows};
use crate::models::gear::{Gear, GearFilter, GearPatch, NewGear};
use crate::models::patch::Patch;
use crate::models::types::{GearId, LocationId};
use std::sync::Arc;
use tokio_postgres::IsolationLevel;

/// Wraps a data-modifying statement on `gear` (which must `RETURNING *`) so
/// the caller gets the joined row back from the same statement.
fn joined(modifying: &str) -> String {
    format!(
        r#"
        WITH g AS ({modifying})
        SELECT
            g.id, g.name, g.description, g.weight, g.cost, g.value, g.legality, g.category, g.location_id,
            l.id AS loc_id, l.name AS loc_name, l.type AS loc_type, l.parent_id AS loc_parent_id
        FROM g
        LEFT JOIN locations l ON g.location_id = l.id
        "#
    )
}

pub struct GearRepository {
    db: Arc<Db>,
}

impl GearRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl GearRepo for GearRepository {
    async fn insert(&self, new: &NewGear) -> DbResult<Gear> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(&joined(
                r#"
                INSERT INTO gear (name, description, weight, cost, value, legality, category, location_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            ))
            .await?;

        let row = client
            .query_one(
                &stmt,
                &[
                    &new.name,
                    &new.description,
                    &new.weight,
                    &new.cost,
                    &new.value,
                    &new.legality,
                    &new.category,
                    &new.location_id,
                ],
            )
            .await?;

        Gear::try_from_row(&row)
    }

    async fn get(&self, id: GearId) -> DbResult<Option<Gear>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(&format!("{GEAR_SELECT} WHERE g.id = $1"))
            .await?;

        let row_opt = client.query_opt(&stmt, &[&id]).await?;
        map_row_opt(row_opt, Gear::try_from_row, &format!("GearRepo::get id={}", id))
    }

    async fn list(&self, filter: &GearFilter) -> DbResult<Vec<Gear>> {
        let client = self.db.get_client().await?;

        let name_pattern = filter.name.as_deref().map(like_pattern);
        let stmt = client
            .prepare_cached(&format!(
                r#"
                {GEAR_SELECT}
                WHERE ($1::text IS NULL OR g.name ILIKE $1)
                  AND ($2::text IS NULL OR g.category = $2)
                ORDER BY g.id
                "#
            ))
            .await?;

        let rows = client.query(&stmt, &[&name_pattern, &filter.category]).await?;
        map_rows(&rows, Gear::try_from_row, "GearRepo::list")
    }

    async fn in_location(&self, location_id: LocationId) -> DbResult<Option<Vec<Gear>>> {
        let mut client = self.db.get_client().await?;
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only(true)
            .start()
            .await?;

        let exists = tx
            .query_opt("SELECT id FROM locations WHERE id = $1", &[&location_id])
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows = tx
            .query(
                &format!("{GEAR_SELECT} WHERE g.location_id = $1 ORDER BY g.id"),
                &[&location_id],
            )
            .await?;
        let gear = map_rows(&rows, Gear::try_from_row, "GearRepo::in_location")?;

        tx.commit().await?;
        Ok(Some(gear))
    }

    async fn update(&self, id: GearId, patch: GearPatch) -> DbResult<Option<Gear>> {
        let GearPatch {
            name,
            description,
            weight,
            cost,
            value,
            legality,
            category,
            location_id,
        } = patch;

        let mut set = Assignments::default();
        if let Patch::Set(v) = name {
            set.push("name", v);
        }
        if let Patch::Set(v) = description {
            set.push("description", v);
        }
        if let Patch::Set(v) = weight {
            set.push("weight", v);
        }
        if let Patch::Set(v) = cost {
            set.push("cost", v);
        }
        if let Patch::Set(v) = value {
            set.push("value", v);
        }
        if let Patch::Set(v) = legality {
            set.push("legality", v);
        }
        if let Patch::Set(v) = category {
            set.push("category", v);
        }
        if let Patch::Set(v) = location_id {
            set.push("location_id", v);
        }

        if set.is_empty() {
            return self.get(id).await;
        }

        let client = self.db.get_client().await?;
        let sql = joined(&format!(
            "UPDATE gear SET {} WHERE id = {} RETURNING *",
            set.set_clause(),
            set.id_placeholder()
        ));

        let row_opt = client.query_opt(&sql, &set.params(&id)).await?;
        map_row_opt(row_opt, Gear::try_from_row, &format!("GearRepo::update id={}", id))
    }

    async fn delete(&self, id: GearId) -> DbResult<bool> {
        let client = self.db.get_client().await?;

        let n = client.execute("DELETE FROM gear WHERE id = $1", &[&id]).await?;
        Ok(n > 0)
    }
}
