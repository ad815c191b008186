//! Initial database migration.
//!
//! Creates the transaction source, journal template, staging, ledger, and
//! snapshot tables, the monthly partition parents, and the partition
//! provisioning functions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TRANSACTION SOURCE
        // ============================================================
        db.execute_unprepared(TXN_SOURCE_SQL).await?;

        // ============================================================
        // PART 2: JOURNAL TEMPLATES
        // ============================================================
        db.execute_unprepared(JOURNAL_TEMPLATES_SQL).await?;
        db.execute_unprepared(TEMPLATE_MATCHES_SQL).await?;
        db.execute_unprepared(TEMPLATE_LINES_SQL).await?;
        db.execute_unprepared(TEMPLATE_LINE_CONDS_SQL).await?;
        db.execute_unprepared(TEMPLATE_CONTROLS_SQL).await?;

        // ============================================================
        // PART 3: STAGING
        // ============================================================
        db.execute_unprepared(JE_HEADER_STAGING_SQL).await?;
        db.execute_unprepared(JE_LINE_STAGING_SQL).await?;

        // ============================================================
        // PART 4: LEDGER
        // ============================================================
        db.execute_unprepared(LEDGER_HEADERS_SQL).await?;
        db.execute_unprepared(LEDGER_LINES_SQL).await?;

        // ============================================================
        // PART 5: BALANCE SNAPSHOTS
        // ============================================================
        db.execute_unprepared(BALANCE_SNAPSHOTS_SQL).await?;

        // ============================================================
        // PART 6: PARTITION PROVISIONING FUNCTIONS
        // ============================================================
        db.execute_unprepared(PARTITION_FUNCTIONS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const TXN_SOURCE_SQL: &str = r"
CREATE SEQUENCE txn_source_rowid_seq AS BIGINT;

-- Monthly-partitioned transaction feed. The partition key must be part
-- of the primary key, so row identity is (source_rowid, txn_month).
CREATE TABLE txn_source (
    source_rowid BIGINT NOT NULL DEFAULT nextval('txn_source_rowid_seq'),
    txn_month DATE NOT NULL,
    txn_type VARCHAR(40) NOT NULL,
    policy_no VARCHAR(40) NOT NULL,
    product_code VARCHAR(40) NOT NULL,
    channel VARCHAR(40) NOT NULL,
    currency CHAR(3) NOT NULL,
    value_date DATE NOT NULL,
    gross_amount NUMERIC(19, 4) NOT NULL,
    tabarru_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    tanahud_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    invest_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    ujroh_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    admin_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (source_rowid, txn_month),
    CONSTRAINT chk_txn_month_is_month_start
        CHECK (txn_month = date_trunc('month', txn_month)::date),
    CONSTRAINT chk_value_date_in_month
        CHECK (date_trunc('month', value_date)::date = txn_month),
    CONSTRAINT chk_currency_format CHECK (currency ~ '^[A-Z]{3}$')
) PARTITION BY RANGE (txn_month);

ALTER SEQUENCE txn_source_rowid_seq OWNED BY txn_source.source_rowid;

CREATE INDEX idx_txn_source_routing ON txn_source(txn_type, product_code, channel);
";

const JOURNAL_TEMPLATES_SQL: &str = r"
CREATE TABLE journal_templates (
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    txn_type VARCHAR(40) NOT NULL,
    je_type VARCHAR(40) NOT NULL,
    description TEXT,
    status VARCHAR(10) NOT NULL DEFAULT 'DRAFT',
    effective_date DATE NOT NULL,
    expiry_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (template_code, template_version),
    CONSTRAINT chk_template_status CHECK (status IN ('DRAFT', 'ACTIVE', 'RETIRED')),
    CONSTRAINT chk_template_window
        CHECK (expiry_date IS NULL OR expiry_date > effective_date)
);

CREATE INDEX idx_journal_templates_routing
    ON journal_templates(txn_type, status, effective_date);
";

const TEMPLATE_MATCHES_SQL: &str = r"
-- Routing rules. NULL product_code or channel is a wildcard.
CREATE TABLE journal_template_matches (
    match_id BIGSERIAL PRIMARY KEY,
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    product_code VARCHAR(40),
    channel VARCHAR(40),
    priority INT NOT NULL DEFAULT 100,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    FOREIGN KEY (template_code, template_version)
        REFERENCES journal_templates(template_code, template_version)
        ON DELETE CASCADE
);

CREATE INDEX idx_template_matches_lookup
    ON journal_template_matches(product_code, channel, priority);
";

const TEMPLATE_LINES_SQL: &str = r"
CREATE TABLE journal_template_lines (
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    line_no INT NOT NULL,
    side CHAR(2) NOT NULL,
    account_code VARCHAR(20) NOT NULL,
    fund_code VARCHAR(20) NOT NULL,
    amount_expr TEXT NOT NULL,
    amount_round INT NOT NULL DEFAULT 2,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (template_code, template_version, line_no),
    FOREIGN KEY (template_code, template_version)
        REFERENCES journal_templates(template_code, template_version)
        ON DELETE CASCADE,
    CONSTRAINT chk_line_side CHECK (side IN ('DR', 'CR')),
    CONSTRAINT chk_line_round CHECK (amount_round BETWEEN 0 AND 28)
);
";

const TEMPLATE_LINE_CONDS_SQL: &str = r"
CREATE TABLE journal_template_line_conds (
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    line_no INT NOT NULL,
    cond_name VARCHAR(60) NOT NULL,
    cond_expr TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (template_code, template_version, line_no, cond_name),
    FOREIGN KEY (template_code, template_version, line_no)
        REFERENCES journal_template_lines(template_code, template_version, line_no)
        ON DELETE CASCADE
);
";

const TEMPLATE_CONTROLS_SQL: &str = r"
CREATE TABLE journal_template_controls (
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    require_balanced BOOLEAN NOT NULL DEFAULT true,
    tolerance_amount NUMERIC(19, 4) NOT NULL DEFAULT 0.01,
    balancing_mode VARCHAR(20) NOT NULL DEFAULT 'ERROR',
    balancing_account VARCHAR(20),
    balancing_fund VARCHAR(20),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (template_code, template_version),
    FOREIGN KEY (template_code, template_version)
        REFERENCES journal_templates(template_code, template_version)
        ON DELETE CASCADE,
    CONSTRAINT chk_balancing_mode CHECK (balancing_mode IN ('ERROR', 'AUTO_BALANCE')),
    CONSTRAINT chk_tolerance_nonnegative CHECK (tolerance_amount >= 0)
);
";

const JE_HEADER_STAGING_SQL: &str = r"
CREATE TABLE je_header_staging (
    run_id UUID NOT NULL,
    je_number VARCHAR(40) NOT NULL,
    je_date DATE NOT NULL,
    je_type VARCHAR(40) NOT NULL,
    source_rowid BIGINT NOT NULL,
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    created_by VARCHAR(100) NOT NULL,
    posted BOOLEAN NOT NULL DEFAULT false,
    posted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (run_id, je_number)
);

CREATE INDEX idx_je_header_staging_unposted
    ON je_header_staging(run_id) WHERE posted = false;
";

const JE_LINE_STAGING_SQL: &str = r"
CREATE TABLE je_line_staging (
    run_id UUID NOT NULL,
    je_number VARCHAR(40) NOT NULL,
    line_no INT NOT NULL,
    side CHAR(2) NOT NULL,
    account_code VARCHAR(20) NOT NULL,
    fund VARCHAR(20) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    product_code VARCHAR(40) NOT NULL,
    channel VARCHAR(40) NOT NULL,
    je_date DATE NOT NULL,
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    posted BOOLEAN NOT NULL DEFAULT false,
    posted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (run_id, je_number, line_no),
    CONSTRAINT chk_staging_line_side CHECK (side IN ('DR', 'CR'))
);

CREATE INDEX idx_je_line_staging_run ON je_line_staging(run_id, je_date);
";

const LEDGER_HEADERS_SQL: &str = r"
CREATE TABLE ledger_entry_headers (
    je_id BIGSERIAL PRIMARY KEY,
    je_number VARCHAR(40) NOT NULL,
    je_date DATE NOT NULL,
    je_type VARCHAR(40) NOT NULL,
    source_rowid BIGINT NOT NULL,
    template_code VARCHAR(40) NOT NULL,
    template_version INT NOT NULL,
    run_id UUID NOT NULL,
    created_by VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- Posting idempotency: one ledger header per journal per template
    -- identity, enforced even under concurrent posters.
    CONSTRAINT uq_ledger_headers_identity
        UNIQUE (je_number, template_code, template_version)
);

CREATE INDEX idx_ledger_headers_run ON ledger_entry_headers(run_id);
CREATE INDEX idx_ledger_headers_date ON ledger_entry_headers(je_date);
";

const LEDGER_LINES_SQL: &str = r"
-- Monthly-partitioned ledger lines. The partition key must be part of
-- the primary key, so row identity is (je_id, line_no, je_date).
CREATE TABLE ledger_entry_lines (
    je_id BIGINT NOT NULL REFERENCES ledger_entry_headers(je_id),
    line_no INT NOT NULL,
    je_date DATE NOT NULL,
    side CHAR(2) NOT NULL,
    account_code VARCHAR(20) NOT NULL,
    fund VARCHAR(20) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (je_id, line_no, je_date),
    CONSTRAINT chk_ledger_line_side CHECK (side IN ('DR', 'CR'))
) PARTITION BY RANGE (je_date);

CREATE INDEX idx_ledger_lines_account
    ON ledger_entry_lines(account_code, fund, je_date);
";

const BALANCE_SNAPSHOTS_SQL: &str = r"
CREATE TABLE account_balance_snapshots (
    period_start DATE NOT NULL,
    account_code VARCHAR(20) NOT NULL,
    fund VARCHAR(20) NOT NULL,
    opening_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    closing_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    calculated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (period_start, account_code, fund)
);
";

const PARTITION_FUNCTIONS_SQL: &str = r"
-- Idempotent and race-safe: concurrent callers may both pass the
-- to_regclass check, so duplicate_table is swallowed.
CREATE OR REPLACE FUNCTION ensure_txn_source_partition(p_month DATE)
RETURNS void AS $fn$
DECLARE
    v_start DATE := date_trunc('month', p_month)::date;
    v_end DATE := (v_start + INTERVAL '1 month')::date;
    v_name TEXT := 'txn_source_' || to_char(v_start, 'YYYYMM');
BEGIN
    IF to_regclass(v_name) IS NOT NULL THEN
        RETURN;
    END IF;
    BEGIN
        EXECUTE format(
            'CREATE TABLE %I PARTITION OF txn_source FOR VALUES FROM (%L) TO (%L)',
            v_name, v_start, v_end
        );
    EXCEPTION WHEN duplicate_table THEN
        NULL;
    END;
END;
$fn$ LANGUAGE plpgsql;

CREATE OR REPLACE FUNCTION ensure_ledger_line_partition(p_month DATE)
RETURNS void AS $fn$
DECLARE
    v_start DATE := date_trunc('month', p_month)::date;
    v_end DATE := (v_start + INTERVAL '1 month')::date;
    v_name TEXT := 'ledger_entry_lines_' || to_char(v_start, 'YYYYMM');
BEGIN
    IF to_regclass(v_name) IS NOT NULL THEN
        RETURN;
    END IF;
    BEGIN
        EXECUTE format(
            'CREATE TABLE %I PARTITION OF ledger_entry_lines FOR VALUES FROM (%L) TO (%L)',
            v_name, v_start, v_end
        );
    EXCEPTION WHEN duplicate_table THEN
        NULL;
    END;
END;
$fn$ LANGUAGE plpgsql;
";

const DROP_ALL_SQL: &str = r"
DROP FUNCTION IF EXISTS ensure_ledger_line_partition(DATE);
DROP FUNCTION IF EXISTS ensure_txn_source_partition(DATE);
DROP TABLE IF EXISTS account_balance_snapshots CASCADE;
DROP TABLE IF EXISTS ledger_entry_lines CASCADE;
DROP TABLE IF EXISTS ledger_entry_headers CASCADE;
DROP TABLE IF EXISTS je_line_staging CASCADE;
DROP TABLE IF EXISTS je_header_staging CASCADE;
DROP TABLE IF EXISTS journal_template_controls CASCADE;
DROP TABLE IF EXISTS journal_template_line_conds CASCADE;
DROP TABLE IF EXISTS journal_template_lines CASCADE;
DROP TABLE IF EXISTS journal_template_matches CASCADE;
DROP TABLE IF EXISTS journal_templates CASCADE;
DROP TABLE IF EXISTS txn_source CASCADE;
";
