//! Physiotherapy notes and painpoints for a visit.
//!
//! Painpoints are body-chart coordinates with no identity across updates:
//! every upsert deletes the existing set and inserts the submitted one.
//! Callers must run the upsert inside a transaction (see
//! [`crate::records::RecordStore::upsert_physiotherapy`]) so readers never
//! observe the window between delete and insert.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Physiotherapy {
    pub id: i64,
    pub visit_id: i64,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Painpoint {
    pub id: i64,
    pub physiotherapy_id: i64,
    pub x_coord: f64,
    pub y_coord: f64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PainpointInput {
    pub x_coord: f64,
    pub y_coord: f64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PhysiotherapyInput {
    pub notes: Option<String>,
    #[serde(default)]
    pub painpoints: Vec<PainpointInput>,
}

/// A physiotherapy record together with its current painpoint set.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhysiotherapyDetail {
    pub physiotherapy: Physiotherapy,
    pub painpoints: Vec<Painpoint>,
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &PhysiotherapyInput,
    actor: Option<i64>,
) -> ClinicResult<PhysiotherapyDetail> {
    let physiotherapy = sqlx::query_as::<_, Physiotherapy>(
        r#"
        INSERT INTO physiotherapy (visit_id, notes, last_updated_by)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (visit_id) DO UPDATE SET
            notes = excluded.notes,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(input.notes.as_deref())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)?;

    sqlx::query("DELETE FROM painpoints WHERE physiotherapy_id = ?1")
        .bind(physiotherapy.id)
        .execute(&mut *conn)
        .await?;

    for point in &input.painpoints {
        sqlx::query(
            r#"
            INSERT INTO painpoints (physiotherapy_id, x_coord, y_coord, last_updated_by)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(physiotherapy.id)
        .bind(point.x_coord)
        .bind(point.y_coord)
        .bind(actor)
        .execute(&mut *conn)
        .await?;
    }

    let painpoints = painpoints_in(conn, physiotherapy.id).await?;

    Ok(PhysiotherapyDetail {
        physiotherapy,
        painpoints,
    })
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<PhysiotherapyDetail>> {
    let physiotherapy =
        sqlx::query_as::<_, Physiotherapy>("SELECT * FROM physiotherapy WHERE visit_id = ?1")
            .bind(visit_id)
            .fetch_optional(&mut *conn)
            .await?;

    match physiotherapy {
        None => Ok(None),
        Some(physiotherapy) => {
            let painpoints = painpoints_in(conn, physiotherapy.id).await?;
            Ok(Some(PhysiotherapyDetail {
                physiotherapy,
                painpoints,
            }))
        }
    }
}

async fn painpoints_in(
    conn: &mut SqliteConnection,
    physiotherapy_id: i64,
) -> ClinicResult<Vec<Painpoint>> {
    let points = sqlx::query_as::<_, Painpoint>(
        r#"
        SELECT id, physiotherapy_id, x_coord, y_coord
          FROM painpoints
         WHERE physiotherapy_id = ?1
         ORDER BY id ASC
        "#,
    )
    .bind(physiotherapy_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(points)
}
