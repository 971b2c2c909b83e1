use std::str::FromStr;

use analysis_core::{
    AnalysisError, Fundamentals, InstrumentFundamentals, ScoreHistoryEntry, ScoreSnapshot,
    ScoringRepository, SectorBenchmark, Signal,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn db_err(e: sqlx::Error) -> AnalysisError {
    AnalysisError::DatabaseError(e.to_string())
}

fn parse_date(raw: &str) -> Result<NaiveDate, AnalysisError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| AnalysisError::DatabaseError(format!("bad snapshot_date '{}': {}", raw, e)))
}

fn parse_signal(raw: &str) -> Result<Signal, AnalysisError> {
    Signal::from_str(raw).map_err(|e| AnalysisError::DatabaseError(e.to_string()))
}

fn parse_decimal(ticker: &str, column: &str, raw: Option<String>) -> Result<Option<Decimal>, AnalysisError> {
    raw.map(|s| {
        Decimal::from_str(&s).map_err(|e| {
            AnalysisError::DatabaseError(format!("bad {} '{}' for {}: {}", column, s, ticker, e))
        })
    })
    .transpose()
}

fn decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

/// SQLite-backed scoring repository.
#[derive(Clone)]
pub struct ScoreDb {
    pool: SqlitePool,
}

/// Internal DB row type with decimal ratios as text
#[derive(Debug, FromRow)]
struct FundamentalsRow {
    ticker: String,
    sector: Option<String>,
    pe_ratio: Option<String>,
    ev_ebitda: Option<String>,
    peg_ratio: Option<String>,
    pb_ratio: Option<String>,
    ps_ratio: Option<String>,
    roic: Option<String>,
    roe: Option<String>,
    gross_margin: Option<String>,
    operating_margin: Option<String>,
    net_margin: Option<String>,
    debt_equity: Option<String>,
    current_ratio: Option<String>,
    fcf_yield: Option<String>,
    interest_coverage: Option<String>,
    revenue_growth: Option<String>,
    earnings_growth: Option<String>,
    dividend_yield: Option<String>,
    payout_ratio: Option<String>,
}

impl FundamentalsRow {
    fn into_instrument(self) -> Result<InstrumentFundamentals, AnalysisError> {
        let t = self.ticker.as_str();
        let fundamentals = Fundamentals {
            pe_ratio: parse_decimal(t, "pe_ratio", self.pe_ratio)?,
            ev_ebitda: parse_decimal(t, "ev_ebitda", self.ev_ebitda)?,
            peg_ratio: parse_decimal(t, "peg_ratio", self.peg_ratio)?,
            pb_ratio: parse_decimal(t, "pb_ratio", self.pb_ratio)?,
            ps_ratio: parse_decimal(t, "ps_ratio", self.ps_ratio)?,
            roic: parse_decimal(t, "roic", self.roic)?,
            roe: parse_decimal(t, "roe", self.roe)?,
            gross_margin: parse_decimal(t, "gross_margin", self.gross_margin)?,
            operating_margin: parse_decimal(t, "operating_margin", self.operating_margin)?,
            net_margin: parse_decimal(t, "net_margin", self.net_margin)?,
            debt_equity: parse_decimal(t, "debt_equity", self.debt_equity)?,
            current_ratio: parse_decimal(t, "current_ratio", self.current_ratio)?,
            fcf_yield: parse_decimal(t, "fcf_yield", self.fcf_yield)?,
            interest_coverage: parse_decimal(t, "interest_coverage", self.interest_coverage)?,
            revenue_growth: parse_decimal(t, "revenue_growth", self.revenue_growth)?,
            earnings_growth: parse_decimal(t, "earnings_growth", self.earnings_growth)?,
            dividend_yield: parse_decimal(t, "dividend_yield", self.dividend_yield)?,
            payout_ratio: parse_decimal(t, "payout_ratio", self.payout_ratio)?,
        };
        Ok(InstrumentFundamentals {
            ticker: self.ticker,
            sector: self.sector,
            fundamentals,
        })
    }
}

#[derive(Debug, FromRow)]
struct BenchmarkRow {
    sector: String,
    avg_pe: Option<f64>,
    avg_ev_ebitda: Option<f64>,
    avg_roic: Option<f64>,
    avg_roe: Option<f64>,
    avg_debt_equity: Option<f64>,
    avg_gross_margin: Option<f64>,
    avg_operating_margin: Option<f64>,
    avg_net_margin: Option<f64>,
    stock_count: i64,
}

impl BenchmarkRow {
    fn into_benchmark(self) -> SectorBenchmark {
        SectorBenchmark {
            sector: self.sector,
            avg_pe: self.avg_pe,
            avg_ev_ebitda: self.avg_ev_ebitda,
            avg_roic: self.avg_roic,
            avg_roe: self.avg_roe,
            avg_debt_equity: self.avg_debt_equity,
            avg_gross_margin: self.avg_gross_margin,
            avg_operating_margin: self.avg_operating_margin,
            avg_net_margin: self.avg_net_margin,
            stock_count: self.stock_count.max(0) as usize,
        }
    }
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    ticker: String,
    sector: Option<String>,
    total_score: f64,
    value_score: f64,
    quality_score: f64,
    momentum_score: f64,
    health_score: f64,
    signal: String,
    calculated_at: String,
}

impl SnapshotRow {
    fn into_snapshot(self) -> Result<ScoreSnapshot, AnalysisError> {
        Ok(ScoreSnapshot {
            signal: parse_signal(&self.signal)?,
            ticker: self.ticker,
            sector: self.sector,
            total_score: self.total_score,
            value_score: self.value_score,
            quality_score: self.quality_score,
            momentum_score: self.momentum_score,
            health_score: self.health_score,
            calculated_at: self.calculated_at.parse::<DateTime<Utc>>().map_err(|e| {
                AnalysisError::DatabaseError(format!("bad calculated_at '{}': {}", self.calculated_at, e))
            })?,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    ticker: String,
    snapshot_date: String,
    total_score: f64,
    value_score: f64,
    quality_score: f64,
    momentum_score: f64,
    health_score: f64,
    signal: String,
}

impl HistoryRow {
    fn into_entry(self) -> Result<ScoreHistoryEntry, AnalysisError> {
        Ok(ScoreHistoryEntry {
            snapshot_date: parse_date(&self.snapshot_date)?,
            signal: parse_signal(&self.signal)?,
            ticker: self.ticker,
            total_score: self.total_score,
            value_score: self.value_score,
            quality_score: self.quality_score,
            momentum_score: self.momentum_score,
            health_score: self.health_score,
        })
    }
}

const HISTORY_COLUMNS: &str = "ticker, snapshot_date, total_score, value_score, quality_score, \
                               momentum_score, health_score, signal";

impl ScoreDb {
    /// Create a new database connection
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is a separate database, so keep exactly one alive.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        let schema = include_str!("../schema.sql");

        // Execute schema (split by statement since sqlx doesn't support multiple statements)
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Register or update an instrument and replace its fundamentals wholesale.
    pub async fn upsert_fundamentals(&self, item: &InstrumentFundamentals) -> Result<(), AnalysisError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO instruments (ticker, sector) VALUES (?, ?)
            ON CONFLICT(ticker) DO UPDATE SET sector = excluded.sector
            "#,
        )
        .bind(&item.ticker)
        .bind(&item.sector)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let f = &item.fundamentals;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO fundamentals (
                ticker, pe_ratio, ev_ebitda, peg_ratio, pb_ratio, ps_ratio,
                roic, roe, gross_margin, operating_margin, net_margin,
                debt_equity, current_ratio, fcf_yield, interest_coverage,
                revenue_growth, earnings_growth, dividend_yield, payout_ratio,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.ticker)
        .bind(decimal_text(f.pe_ratio))
        .bind(decimal_text(f.ev_ebitda))
        .bind(decimal_text(f.peg_ratio))
        .bind(decimal_text(f.pb_ratio))
        .bind(decimal_text(f.ps_ratio))
        .bind(decimal_text(f.roic))
        .bind(decimal_text(f.roe))
        .bind(decimal_text(f.gross_margin))
        .bind(decimal_text(f.operating_margin))
        .bind(decimal_text(f.net_margin))
        .bind(decimal_text(f.debt_equity))
        .bind(decimal_text(f.current_ratio))
        .bind(decimal_text(f.fcf_yield))
        .bind(decimal_text(f.interest_coverage))
        .bind(decimal_text(f.revenue_growth))
        .bind(decimal_text(f.earnings_growth))
        .bind(decimal_text(f.dividend_yield))
        .bind(decimal_text(f.payout_ratio))
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl ScoringRepository for ScoreDb {
    async fn list_fundamentals(&self) -> Result<Vec<InstrumentFundamentals>, AnalysisError> {
        let rows: Vec<FundamentalsRow> = sqlx::query_as(
            r#"
            SELECT
                i.ticker, i.sector,
                f.pe_ratio, f.ev_ebitda, f.peg_ratio, f.pb_ratio, f.ps_ratio,
                f.roic, f.roe, f.gross_margin, f.operating_margin, f.net_margin,
                f.debt_equity, f.current_ratio, f.fcf_yield, f.interest_coverage,
                f.revenue_growth, f.earnings_growth, f.dividend_yield, f.payout_ratio
            FROM fundamentals f
            JOIN instruments i ON i.ticker = f.ticker
            ORDER BY i.ticker
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(FundamentalsRow::into_instrument).collect()
    }

    async fn put_sector_benchmark(&self, benchmark: &SectorBenchmark) -> Result<(), AnalysisError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sector_benchmarks (
                sector, avg_pe, avg_ev_ebitda, avg_roic, avg_roe, avg_debt_equity,
                avg_gross_margin, avg_operating_margin, avg_net_margin,
                stock_count, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&benchmark.sector)
        .bind(benchmark.avg_pe)
        .bind(benchmark.avg_ev_ebitda)
        .bind(benchmark.avg_roic)
        .bind(benchmark.avg_roe)
        .bind(benchmark.avg_debt_equity)
        .bind(benchmark.avg_gross_margin)
        .bind(benchmark.avg_operating_margin)
        .bind(benchmark.avg_net_margin)
        .bind(benchmark.stock_count as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_sector_benchmarks(&self) -> Result<Vec<SectorBenchmark>, AnalysisError> {
        let rows: Vec<BenchmarkRow> = sqlx::query_as(
            r#"
            SELECT
                sector, avg_pe, avg_ev_ebitda, avg_roic, avg_roe, avg_debt_equity,
                avg_gross_margin, avg_operating_margin, avg_net_margin, stock_count
            FROM sector_benchmarks
            ORDER BY sector
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(BenchmarkRow::into_benchmark).collect())
    }

    async fn put_score_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<(), AnalysisError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO score_snapshots (
                ticker, sector, total_score, value_score, quality_score,
                momentum_score, health_score, signal, calculated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&snapshot.ticker)
        .bind(&snapshot.sector)
        .bind(snapshot.total_score)
        .bind(snapshot.value_score)
        .bind(snapshot.quality_score)
        .bind(snapshot.momentum_score)
        .bind(snapshot.health_score)
        .bind(snapshot.signal.as_str())
        .bind(snapshot.calculated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_score_snapshot(&self, ticker: &str) -> Result<Option<ScoreSnapshot>, AnalysisError> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT ticker, sector, total_score, value_score, quality_score,
                   momentum_score, health_score, signal, calculated_at
            FROM score_snapshots
            WHERE ticker = ?
            "#,
        )
        .bind(ticker)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SnapshotRow::into_snapshot).transpose()
    }

    async fn list_score_snapshots(&self) -> Result<Vec<ScoreSnapshot>, AnalysisError> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT ticker, sector, total_score, value_score, quality_score,
                   momentum_score, health_score, signal, calculated_at
            FROM score_snapshots
            ORDER BY ticker
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }

    async fn get_history_entry(
        &self,
        ticker: &str,
        snapshot_date: NaiveDate,
    ) -> Result<Option<ScoreHistoryEntry>, AnalysisError> {
        let sql = format!(
            "SELECT {} FROM score_history WHERE ticker = ? AND snapshot_date = ?",
            HISTORY_COLUMNS
        );
        let row: Option<HistoryRow> = sqlx::query_as(&sql)
            .bind(ticker)
            .bind(snapshot_date.format(DATE_FORMAT).to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(HistoryRow::into_entry).transpose()
    }

    async fn put_history_entry(&self, entry: &ScoreHistoryEntry) -> Result<bool, AnalysisError> {
        let date = entry.snapshot_date.format(DATE_FORMAT).to_string();
        let now = Utc::now().to_rfc3339();

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM score_history WHERE ticker = ? AND snapshot_date = ?")
                .bind(&entry.ticker)
                .bind(&date)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        if let Some((id,)) = existing {
            sqlx::query(
                r#"
                UPDATE score_history
                SET total_score = ?, value_score = ?, quality_score = ?,
                    momentum_score = ?, health_score = ?, signal = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(entry.total_score)
            .bind(entry.value_score)
            .bind(entry.quality_score)
            .bind(entry.momentum_score)
            .bind(entry.health_score)
            .bind(entry.signal.as_str())
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO score_history (
                ticker, snapshot_date, total_score, value_score, quality_score,
                momentum_score, health_score, signal, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.ticker)
        .bind(&date)
        .bind(entry.total_score)
        .bind(entry.value_score)
        .bind(entry.quality_score)
        .bind(entry.momentum_score)
        .bind(entry.health_score)
        .bind(entry.signal.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(true)
    }

    async fn list_history_since(
        &self,
        ticker: &str,
        since: NaiveDate,
    ) -> Result<Vec<ScoreHistoryEntry>, AnalysisError> {
        let sql = format!(
            "SELECT {} FROM score_history WHERE ticker = ? AND snapshot_date >= ? \
             ORDER BY snapshot_date ASC",
            HISTORY_COLUMNS
        );
        let rows: Vec<HistoryRow> = sqlx::query_as(&sql)
            .bind(ticker)
            .bind(since.format(DATE_FORMAT).to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    async fn latest_history_at_or_before(
        &self,
        ticker: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<ScoreHistoryEntry>, AnalysisError> {
        let sql = format!(
            "SELECT {} FROM score_history WHERE ticker = ? AND snapshot_date <= ? \
             ORDER BY snapshot_date DESC LIMIT 1",
            HISTORY_COLUMNS
        );
        let row: Option<HistoryRow> = sqlx::query_as(&sql)
            .bind(ticker)
            .bind(on_or_before.format(DATE_FORMAT).to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(HistoryRow::into_entry).transpose()
    }

    async fn latest_history_for_all_at_or_before(
        &self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ScoreHistoryEntry>, AnalysisError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT h.ticker, h.snapshot_date, h.total_score, h.value_score, h.quality_score,
                   h.momentum_score, h.health_score, h.signal
            FROM score_history h
            JOIN (
                SELECT ticker, MAX(snapshot_date) AS max_date
                FROM score_history
                WHERE snapshot_date <= ?
                GROUP BY ticker
            ) latest ON latest.ticker = h.ticker AND latest.max_date = h.snapshot_date
            ORDER BY h.ticker
            "#,
        )
        .bind(on_or_before.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    async fn delete_history_before(&self, cutoff: NaiveDate) -> Result<u64, AnalysisError> {
        let result = sqlx::query("DELETE FROM score_history WHERE snapshot_date < ?")
            .bind(cutoff.format(DATE_FORMAT).to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        tracing::debug!("Deleted {} score history rows before {}", result.rows_affected(), cutoff);
        Ok(result.rows_affected())
    }
}
