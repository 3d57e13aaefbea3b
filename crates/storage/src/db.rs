use pramaan_core::{Field, FieldRecord};
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issued_certificates (
            digest TEXT PRIMARY KEY,
            scheme TEXT NOT NULL,
            university_name TEXT,
            holder_name TEXT,
            certificate_id TEXT,
            issuer TEXT,
            issued_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_issued_certificate_id ON issued_certificates (certificate_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row of the registry: a digest plus enough of the record to recognize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCertificate {
    pub digest: String,
    pub scheme: String,
    pub university_name: Option<String>,
    pub holder_name: Option<String>,
    pub certificate_id: Option<String>,
    pub issuer: Option<String>,
    pub issued_at: String,
}

/// What gets written for a newly issued certificate.
#[derive(Debug, Clone)]
pub struct NewIssued<'a> {
    pub digest: &'a str,
    pub scheme: &'a str,
    pub record: &'a FieldRecord,
    pub issuer: Option<&'a str>,
}

/// Insert a digest; returns `false` when it was already registered.
pub async fn insert_issued(pool: &DbPool, new: &NewIssued<'_>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO issued_certificates (digest, scheme, university_name, holder_name, certificate_id, issuer) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(new.digest)
    .bind(new.scheme)
    .bind(new.record.get(Field::UniversityName))
    .bind(new.record.get(Field::HolderName))
    .bind(new.record.get(Field::CertificateId))
    .bind(new.issuer)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn digest_exists(pool: &DbPool, digest: &str) -> Result<bool, sqlx::Error> {
    let (exists,): (i64,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM issued_certificates WHERE digest = ?)")
            .bind(digest)
            .fetch_one(pool)
            .await?;
    Ok(exists != 0)
}

type IssuedRow = (String, String, Option<String>, Option<String>, Option<String>, Option<String>, String);

fn from_row(r: IssuedRow) -> IssuedCertificate {
    IssuedCertificate {
        digest: r.0,
        scheme: r.1,
        university_name: r.2,
        holder_name: r.3,
        certificate_id: r.4,
        issuer: r.5,
        issued_at: r.6,
    }
}

pub async fn find_by_digest(
    pool: &DbPool,
    digest: &str,
) -> Result<Option<IssuedCertificate>, sqlx::Error> {
    let row = sqlx::query_as::<_, IssuedRow>(
        "SELECT digest, scheme, university_name, holder_name, certificate_id, issuer, issued_at FROM issued_certificates WHERE digest = ?",
    )
    .bind(digest)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(from_row))
}

pub async fn list_issued(pool: &DbPool, limit: i64) -> Result<Vec<IssuedCertificate>, sqlx::Error> {
    let rows = sqlx::query_as::<_, IssuedRow>(
        "SELECT digest, scheme, university_name, holder_name, certificate_id, issuer, issued_at FROM issued_certificates ORDER BY issued_at DESC, digest LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(from_row).collect())
}

pub async fn count_issued(pool: &DbPool) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM issued_certificates")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
