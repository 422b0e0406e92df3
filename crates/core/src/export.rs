//! Referral export read path.
//!
//! Joins every referral written on a given visit date to its patient and
//! visit, in the shape the clinic's end-of-day referral letters are built
//! from. Document rendering is a consumer concern; this module only
//! produces the rows, plus a plain CSV rendering for spreadsheet import.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use utoipa::ToSchema;

use crate::ClinicResult;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ReferralExportRow {
    pub referral_date: NaiveDate,
    pub referral_type: String,
    pub illness: Option<String>,
    pub duration: Option<String>,
    pub reason: Option<String>,
    pub english_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub queue_no: String,
}

#[derive(Clone)]
pub struct ExportService {
    pool: SqlitePool,
}

impl ExportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All referrals for visits on `date`, ordered by patient name then
    /// visit creation.
    pub async fn referrals_by_date(&self, date: NaiveDate) -> ClinicResult<Vec<ReferralExportRow>> {
        let rows = sqlx::query_as::<_, ReferralExportRow>(
            r#"
            SELECT r.referral_date,
                   r.referral_type,
                   r.illness,
                   r.duration,
                   r.reason,
                   p.english_name,
                   p.date_of_birth,
                   p.sex,
                   v.queue_no
              FROM referral r
              JOIN visits v ON v.id = r.visit_id
              JOIN patients p ON p.id = v.patient_id
             WHERE v.visit_date = ?1
             ORDER BY p.english_name ASC, v.created_at ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Render export rows as CSV with a header line.
pub fn render_csv(rows: &[ReferralExportRow]) -> String {
    let mut out = String::from(
        "patient_name,queue_no,referral_date,referral_type,illness,duration,reason\n",
    );
    for row in rows {
        let fields = [
            row.english_name.as_str(),
            row.queue_no.as_str(),
            &row.referral_date.to_string(),
            row.referral_type.as_str(),
            row.illness.as_deref().unwrap_or(""),
            row.duration.as_deref().unwrap_or(""),
            row.reason.as_deref().unwrap_or(""),
        ]
        .map(csv_field);
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod export_tests {
    use super::*;

    fn row(name: &str, reason: Option<&str>) -> ReferralExportRow {
        ReferralExportRow {
            referral_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            referral_type: "SEVA".into(),
            illness: Some("cataract".into()),
            duration: Some("2 months".into()),
            reason: reason.map(Into::into),
            english_name: name.into(),
            date_of_birth: None,
            sex: None,
            queue_no: "2A".into(),
        }
    }

    #[test]
    fn csv_quotes_fields_with_delimiters() {
        let csv = render_csv(&[row("Alice", Some("blurred vision, both eyes"))]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "patient_name,queue_no,referral_date,referral_type,illness,duration,reason"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Alice,2A,2026-03-01,SEVA,cataract,2 months,\"blurred vision, both eyes\""
        );
    }

    #[test]
    fn csv_escapes_embedded_quotes() {
        let csv = render_csv(&[row("Bora", Some("patient says \"cannot see\""))]);
        assert!(csv.contains("\"patient says \"\"cannot see\"\"\""));
    }
}
