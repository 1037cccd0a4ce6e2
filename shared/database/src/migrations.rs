use anyhow::Result;
use sqlx::PgPool;

/// Creates every table and index. Safe to run on each start.
pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("PostgreSQL migrations completed");
    Ok(())
}

/// Parents before children so foreign keys resolve.
const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS product_briefs (
        id UUID PRIMARY KEY,
        product_name VARCHAR(200) NOT NULL,
        category VARCHAR(100) NOT NULL,
        benchmark_brand_reference VARCHAR(200),
        benchmark_website_url VARCHAR(500),
        package_size VARCHAR(100),
        storage_requirements VARCHAR(200),
        country_of_origin VARCHAR(100),
        is_kosher_certified BOOLEAN NOT NULL DEFAULT FALSE,
        kosher_organization VARCHAR(100),
        kosher_symbol VARCHAR(50),
        special_attributes TEXT,
        image_url VARCHAR(500),
        additional_notes TEXT,
        status VARCHAR(20) NOT NULL DEFAULT 'Draft',
        correlation_id VARCHAR(100) UNIQUE,
        is_workflow_completed BOOLEAN NOT NULL DEFAULT FALSE,
        workflow_completed_at TIMESTAMPTZ,
        created_by VARCHAR(100) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_by VARCHAR(100),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rfqs (
        id UUID PRIMARY KEY,
        rfq_number VARCHAR(50) NOT NULL UNIQUE,
        title VARCHAR(200) NOT NULL,
        description TEXT NOT NULL,
        category VARCHAR(100),
        package_size VARCHAR(100),
        country_of_origin VARCHAR(100),
        is_kosher_certified BOOLEAN NOT NULL DEFAULT FALSE,
        kosher_organization VARCHAR(100),
        special_attributes TEXT,
        additional_notes TEXT,
        issue_date TIMESTAMPTZ NOT NULL,
        response_deadline TIMESTAMPTZ NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'Active',
        response_count BIGINT NOT NULL DEFAULT 0,
        product_brief_id UUID NOT NULL UNIQUE REFERENCES product_briefs(id) ON DELETE CASCADE,
        created_by VARCHAR(100) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_by VARCHAR(100),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id UUID PRIMARY KEY,
        project_number VARCHAR(50) NOT NULL UNIQUE,
        title VARCHAR(250) NOT NULL,
        description TEXT NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'Planning',
        priority VARCHAR(20) NOT NULL DEFAULT 'Medium',
        start_date TIMESTAMPTZ NOT NULL,
        expected_end_date TIMESTAMPTZ,
        actual_end_date TIMESTAMPTZ,
        assigned_to VARCHAR(100),
        notes TEXT,
        rfq_id UUID NOT NULL REFERENCES rfqs(id) ON DELETE CASCADE,
        created_by VARCHAR(100) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_by VARCHAR(100),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS suppliers (
        id UUID PRIMARY KEY,
        company_name VARCHAR(200) NOT NULL,
        contact_name VARCHAR(200),
        email VARCHAR(255) NOT NULL UNIQUE,
        phone VARCHAR(50),
        country VARCHAR(100),
        website VARCHAR(500),
        description TEXT,
        is_verified BOOLEAN NOT NULL DEFAULT FALSE,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS buyers (
        id UUID PRIMARY KEY,
        company_name VARCHAR(200) NOT NULL,
        contact_name VARCHAR(200),
        email VARCHAR(255) NOT NULL UNIQUE,
        phone VARCHAR(50),
        country VARCHAR(100),
        buyer_type VARCHAR(50),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        name VARCHAR(200) NOT NULL,
        sku VARCHAR(100) UNIQUE,
        description TEXT,
        category VARCHAR(100),
        sub_category VARCHAR(100),
        unit VARCHAR(50),
        price DOUBLE PRECISION NOT NULL DEFAULT 0,
        min_order_quantity DOUBLE PRECISION,
        packaging_type VARCHAR(100),
        is_kosher BOOLEAN NOT NULL DEFAULT FALSE,
        is_organic BOOLEAN NOT NULL DEFAULT FALSE,
        is_gluten_free BOOLEAN NOT NULL DEFAULT FALSE,
        is_vegan BOOLEAN NOT NULL DEFAULT FALSE,
        certifications TEXT,
        country_of_origin VARCHAR(100),
        brand VARCHAR(100),
        shelf_life VARCHAR(100),
        storage_requirements VARCHAR(200),
        image_url VARCHAR(500),
        supplier_id UUID REFERENCES suppliers(id) ON DELETE SET NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_by VARCHAR(100),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_by VARCHAR(100),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        order_number VARCHAR(50) NOT NULL UNIQUE,
        buyer_id UUID NOT NULL REFERENCES buyers(id) ON DELETE RESTRICT,
        supplier_id UUID REFERENCES suppliers(id) ON DELETE SET NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'Pending',
        total_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
        currency VARCHAR(3) NOT NULL DEFAULT 'USD',
        order_date TIMESTAMPTZ NOT NULL,
        delivery_date TIMESTAMPTZ,
        notes TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        product_id UUID NOT NULL REFERENCES products(id) ON DELETE RESTRICT,
        quantity DOUBLE PRECISION NOT NULL,
        unit_price DOUBLE PRECISION NOT NULL,
        line_total DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS email_threads (
        id UUID PRIMARY KEY,
        subject VARCHAR(500) NOT NULL,
        participant_emails JSONB NOT NULL DEFAULT '[]',
        last_activity_at TIMESTAMPTZ NOT NULL,
        email_count BIGINT NOT NULL DEFAULT 0,
        has_unread BOOLEAN NOT NULL DEFAULT FALSE,
        is_archived BOOLEAN NOT NULL DEFAULT FALSE,
        is_important BOOLEAN NOT NULL DEFAULT FALSE,
        category VARCHAR(100),
        supplier_id UUID,
        buyer_id UUID,
        user_id VARCHAR(100),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS emails (
        id UUID PRIMARY KEY,
        message_id VARCHAR(255),
        thread_id UUID REFERENCES email_threads(id) ON DELETE SET NULL,
        from_email VARCHAR(255) NOT NULL,
        to_email TEXT NOT NULL,
        cc_email TEXT,
        bcc_email TEXT,
        subject VARCHAR(500) NOT NULL,
        html_body TEXT,
        plain_text_body TEXT,
        direction VARCHAR(20) NOT NULL,
        status VARCHAR(20) NOT NULL,
        provider VARCHAR(50),
        supplier_id UUID,
        buyer_id UUID,
        user_id VARCHAR(100),
        category VARCHAR(100),
        metadata TEXT,
        folder VARCHAR(20) NOT NULL DEFAULT 'inbox',
        is_archived BOOLEAN NOT NULL DEFAULT FALSE,
        archived_at TIMESTAMPTZ,
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
        deleted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        sent_at TIMESTAMPTZ,
        received_at TIMESTAMPTZ,
        read_at TIMESTAMPTZ,
        failed_at TIMESTAMPTZ,
        error_message TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS email_attachments (
        id UUID PRIMARY KEY,
        email_id UUID NOT NULL REFERENCES emails(id) ON DELETE CASCADE,
        file_name VARCHAR(255) NOT NULL,
        content_type VARCHAR(100) NOT NULL,
        file_size BIGINT NOT NULL DEFAULT 0,
        is_inline BOOLEAN NOT NULL DEFAULT FALSE,
        content_id VARCHAR(255),
        content BYTEA,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_product_briefs_status ON product_briefs(status)",
    "CREATE INDEX IF NOT EXISTS idx_product_briefs_created_by ON product_briefs(created_by)",
    "CREATE INDEX IF NOT EXISTS idx_projects_rfq_id ON projects(rfq_id)",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)",
    "CREATE INDEX IF NOT EXISTS idx_products_supplier_id ON products(supplier_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_buyer_id ON orders(buyer_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items(order_id)",
    "CREATE INDEX IF NOT EXISTS idx_emails_thread_id ON emails(thread_id)",
    "CREATE INDEX IF NOT EXISTS idx_emails_message_id ON emails(message_id)",
    "CREATE INDEX IF NOT EXISTS idx_emails_to_email ON emails(to_email)",
    "CREATE INDEX IF NOT EXISTS idx_email_threads_last_activity ON email_threads(last_activity_at DESC)",
];
