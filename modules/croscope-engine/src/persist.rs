//! Best-effort report persistence.
//!
//! One row per finished analysis in `website_analysis`. The engine logs and
//! swallows sink errors; a report is always returned to the caller whether or
//! not it was stored.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use croscope_common::AnalysisReport;

use crate::traits::PersistenceSink;

pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(pool: &PgPool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS website_analysis (
                id                   UUID         PRIMARY KEY,
                url                  TEXT         NOT NULL,
                overall_score        BIGINT       NOT NULL,
                product_page_score   BIGINT       NOT NULL,
                cart_page_score      BIGINT       NOT NULL,
                mobile_score         BIGINT       NOT NULL,
                trust_signals_score  BIGINT       NOT NULL,
                coupons_score        BIGINT       NOT NULL,
                delivery_score       BIGINT       NOT NULL,
                visual_analysis      JSONB        NOT NULL,
                element_analysis     JSONB        NOT NULL,
                recommendations      JSONB        NOT NULL,
                models_used          TEXT[]       NOT NULL,
                created_at           TIMESTAMPTZ  NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceSink for PostgresSink {
    async fn store(&self, report: &AnalysisReport) -> Result<()> {
        sqlx::query(
            "INSERT INTO website_analysis (
                id, url, overall_score,
                product_page_score, cart_page_score, mobile_score,
                trust_signals_score, coupons_score, delivery_score,
                visual_analysis, element_analysis, recommendations,
                models_used, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(report.id)
        .bind(&report.url)
        .bind(report.overall_score)
        .bind(report.category_scores.product_page)
        .bind(report.category_scores.cart_page)
        .bind(report.category_scores.mobile)
        .bind(report.category_scores.trust_signals)
        .bind(report.category_scores.coupons)
        .bind(report.category_scores.delivery)
        .bind(serde_json::to_value(&report.visual_analysis)?)
        .bind(serde_json::to_value(&report.element_analysis)?)
        .bind(serde_json::to_value(&report.recommendations)?)
        .bind(&report.models_used)
        .bind(report.created_at)
        .execute(&self.pool)
        .await?;

        debug!(url = %report.url, id = %report.id, "Report persisted");
        Ok(())
    }
}
