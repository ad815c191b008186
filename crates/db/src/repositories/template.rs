//! Template repository for resolving and assembling journal templates.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};

use saldo_core::template::{
    Template, TemplateCondition, TemplateControl, TemplateError as TemplateFieldError,
    TemplateLine,
};

use crate::entities::{
    journal_template_controls, journal_template_line_conds, journal_template_lines,
    journal_template_matches, journal_templates,
};

/// Status value for templates eligible to route transactions.
const STATUS_ACTIVE: &str = "ACTIVE";

/// Error types for template resolution.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No active template routes the routing key on the given date.
    #[error(
        "No active template for txn_type {txn_type}, product {product_code}, \
         channel {channel} as of {as_of}"
    )]
    NoActiveTemplate {
        txn_type: String,
        product_code: String,
        channel: String,
        as_of: NaiveDate,
    },

    /// A stored side or balancing mode failed to parse.
    #[error("Template {code} v{version}: {source}")]
    InvalidField {
        code: String,
        version: i32,
        source: TemplateFieldError,
    },

    /// A stored rounding precision is outside the supported range.
    #[error("Template {code} v{version} line {line_no}: rounding precision {value} out of range")]
    InvalidRounding {
        code: String,
        version: i32,
        line_no: i32,
        value: i32,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Repository for journal template resolution.
pub struct TemplateRepository {
    db: DatabaseConnection,
}

impl TemplateRepository {
    /// Creates a new template repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolves the template that routes `(txn_type, product_code, channel)`
    /// on `as_of`, then assembles it with lines, conditions, and controls.
    ///
    /// Candidates are ACTIVE templates whose effective window covers `as_of`.
    /// Among their match rows, exact values beat NULL wildcards, lower
    /// priority wins, and the newest version breaks remaining ties.
    pub async fn resolve(
        &self,
        txn_type: &str,
        product_code: &str,
        channel: &str,
        as_of: NaiveDate,
    ) -> Result<Template, TemplateError> {
        let no_template = || TemplateError::NoActiveTemplate {
            txn_type: txn_type.to_string(),
            product_code: product_code.to_string(),
            channel: channel.to_string(),
            as_of,
        };

        // 1. Candidate template versions routed by txn_type, in window.
        let candidates = journal_templates::Entity::find()
            .filter(journal_templates::Column::TxnType.eq(txn_type))
            .filter(journal_templates::Column::Status.eq(STATUS_ACTIVE))
            .filter(journal_templates::Column::EffectiveDate.lte(as_of))
            .filter(
                Condition::any()
                    .add(journal_templates::Column::ExpiryDate.is_null())
                    .add(journal_templates::Column::ExpiryDate.gt(as_of)),
            )
            .all(&self.db)
            .await?;

        if candidates.is_empty() {
            return Err(no_template());
        }

        let codes: Vec<&str> = candidates
            .iter()
            .map(|c| c.template_code.as_str())
            .collect();

        // 2. Match rows for those codes where product and channel either
        //    equal the key or are NULL wildcards.
        let mut matches = journal_template_matches::Entity::find()
            .filter(journal_template_matches::Column::TemplateCode.is_in(codes))
            .filter(
                Condition::any()
                    .add(journal_template_matches::Column::ProductCode.eq(product_code))
                    .add(journal_template_matches::Column::ProductCode.is_null()),
            )
            .filter(
                Condition::any()
                    .add(journal_template_matches::Column::Channel.eq(channel))
                    .add(journal_template_matches::Column::Channel.is_null()),
            )
            .all(&self.db)
            .await?;

        // The code filter above cannot see versions; drop match rows whose
        // exact (code, version) is not an in-window candidate.
        matches.retain(|m| {
            candidates.iter().any(|c| {
                c.template_code == m.template_code && c.template_version == m.template_version
            })
        });

        matches.sort_by(compare_matches);

        let winner = matches.first().ok_or_else(no_template)?;
        let header = candidates
            .iter()
            .find(|c| {
                c.template_code == winner.template_code
                    && c.template_version == winner.template_version
            })
            .ok_or_else(no_template)?;

        self.assemble(header).await
    }

    /// Loads a specific template version with lines, conditions, and controls.
    pub async fn load(&self, code: &str, version: i32) -> Result<Option<Template>, TemplateError> {
        let header = journal_templates::Entity::find_by_id((code.to_string(), version))
            .one(&self.db)
            .await?;
        match header {
            Some(header) => Ok(Some(self.assemble(&header).await?)),
            None => Ok(None),
        }
    }

    async fn assemble(
        &self,
        header: &journal_templates::Model,
    ) -> Result<Template, TemplateError> {
        let code = header.template_code.as_str();
        let version = header.template_version;
        let invalid_field = |source| TemplateError::InvalidField {
            code: code.to_string(),
            version,
            source,
        };

        let line_rows = journal_template_lines::Entity::find()
            .filter(journal_template_lines::Column::TemplateCode.eq(code))
            .filter(journal_template_lines::Column::TemplateVersion.eq(version))
            .order_by_asc(journal_template_lines::Column::LineNo)
            .all(&self.db)
            .await?;

        let cond_rows = journal_template_line_conds::Entity::find()
            .filter(journal_template_line_conds::Column::TemplateCode.eq(code))
            .filter(journal_template_line_conds::Column::TemplateVersion.eq(version))
            .order_by_asc(journal_template_line_conds::Column::LineNo)
            .order_by_asc(journal_template_line_conds::Column::CondName)
            .all(&self.db)
            .await?;

        let mut conds_by_line: HashMap<i32, Vec<TemplateCondition>> = HashMap::new();
        for row in cond_rows {
            conds_by_line
                .entry(row.line_no)
                .or_default()
                .push(TemplateCondition {
                    cond_name: row.cond_name,
                    cond_expr: row.cond_expr,
                });
        }

        let mut lines = Vec::with_capacity(line_rows.len());
        for row in line_rows {
            let side = row.side.parse().map_err(invalid_field)?;
            let amount_round = u32::try_from(row.amount_round).map_err(|_| {
                TemplateError::InvalidRounding {
                    code: code.to_string(),
                    version,
                    line_no: row.line_no,
                    value: row.amount_round,
                }
            })?;
            lines.push(TemplateLine {
                line_no: row.line_no,
                side,
                account_code: row.account_code,
                fund_code: row.fund_code,
                amount_expr: row.amount_expr,
                amount_round,
                is_active: row.is_active,
                conditions: conds_by_line.remove(&row.line_no).unwrap_or_default(),
            });
        }

        let control = journal_template_controls::Entity::find_by_id((code.to_string(), version))
            .one(&self.db)
            .await?;
        let control = match control {
            Some(row) => TemplateControl {
                require_balanced: row.require_balanced,
                tolerance_amount: row.tolerance_amount,
                balancing_mode: row.balancing_mode.parse().map_err(invalid_field)?,
                balancing_account: row.balancing_account,
                balancing_fund: row.balancing_fund,
            },
            None => TemplateControl::default(),
        };

        Ok(Template {
            code: header.template_code.clone(),
            version,
            txn_type: header.txn_type.clone(),
            je_type: header.je_type.clone(),
            description: header.description.clone(),
            lines,
            control,
        })
    }
}

/// Ordering over match rows: the first row after sorting wins.
///
/// Lower priority first, then exact product before wildcard, then exact
/// channel before wildcard, then newer version, then template code for
/// a stable total order.
fn compare_matches(
    a: &journal_template_matches::Model,
    b: &journal_template_matches::Model,
) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.product_code.is_none().cmp(&b.product_code.is_none()))
        .then_with(|| a.channel.is_none().cmp(&b.channel.is_none()))
        .then_with(|| b.template_version.cmp(&a.template_version))
        .then_with(|| a.template_code.cmp(&b.template_code))
}
