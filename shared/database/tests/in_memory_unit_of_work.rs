//! Repository and unit-of-work behaviour on the in-memory backend.

use chrono::{Duration, Utc};
use foodx_database::predicate::field;
use foodx_database::{
    InMemoryDatabase, ProductBriefQueries, ProductQueries, ProjectQueries, Query, Repository,
    RepositoryError, RfqQueries, UnitOfWork, UnitOfWorkFactory,
};
use foodx_models::{
    Buyer, BuyerInput, NewProductBrief, Order, OrderStatus, Product, ProductBrief, ProductInput,
    Project, ProjectPriority, ProjectStatus, Rfq, RfqStatus, Supplier, SupplierInput,
};
use uuid::Uuid;

fn brief(name: &str) -> ProductBrief {
    ProductBrief::new(NewProductBrief::named(name, "Grains"), "buyer-1", None, Utc::now())
}

fn rfq_for(brief: &ProductBrief, number: &str) -> Rfq {
    let now = Utc::now();
    Rfq {
        id: Uuid::new_v4(),
        rfq_number: number.to_string(),
        title: brief.product_name.clone(),
        description: format!("RFQ for {}", brief.product_name),
        category: Some(brief.category.clone()),
        package_size: None,
        country_of_origin: None,
        is_kosher_certified: false,
        kosher_organization: None,
        special_attributes: None,
        additional_notes: None,
        issue_date: now,
        response_deadline: now + Duration::days(14),
        status: RfqStatus::Active,
        response_count: 0,
        product_brief_id: brief.id,
        created_by: "buyer-1".into(),
        created_at: now,
        updated_by: None,
        updated_at: None,
    }
}

fn project_for(rfq: &Rfq, number: &str) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::new_v4(),
        project_number: number.to_string(),
        title: format!("Project: {}", rfq.title),
        description: format!("Procurement project for {}", rfq.title),
        status: ProjectStatus::Planning,
        priority: ProjectPriority::Medium,
        start_date: now,
        expected_end_date: Some(rfq.response_deadline + Duration::days(30)),
        actual_end_date: None,
        assigned_to: Some("buyer-1".into()),
        notes: None,
        rfq_id: rfq.id,
        created_by: "buyer-1".into(),
        created_at: now,
        updated_by: None,
        updated_at: None,
    }
}

fn product(name: &str, sku: Option<&str>, active: bool) -> Product {
    let mut product = Product::new(
        ProductInput {
            name: name.to_string(),
            sku: sku.map(str::to_string),
            category: Some("Grains".into()),
            price: 4.5,
            ..Default::default()
        },
        None,
        Utc::now(),
    );
    product.is_active = active;
    product
}

#[tokio::test]
async fn test_delete_brief_cascades_to_rfq_and_project() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    let brief = uow.product_briefs().add(brief("Organic Quinoa")).await.unwrap();
    let rfq = uow.rfqs().add(rfq_for(&brief, "RFQ-2026-001")).await.unwrap();
    uow.projects().add(project_for(&rfq, "PRJ-2026-001")).await.unwrap();

    assert!(uow.product_briefs().delete(brief.id).await.unwrap());

    assert_eq!(uow.rfqs().count(None).await.unwrap(), 0);
    assert_eq!(uow.projects().count(None).await.unwrap(), 0);
    assert!(!uow.product_briefs().delete(brief.id).await.unwrap());
}

#[tokio::test]
async fn test_unique_and_foreign_key_violations() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    let first = uow.product_briefs().add(brief("Oats")).await.unwrap();
    let second = uow.product_briefs().add(brief("Rice")).await.unwrap();
    uow.rfqs().add(rfq_for(&first, "RFQ-2026-001")).await.unwrap();

    let duplicate = uow.rfqs().add(rfq_for(&second, "RFQ-2026-001")).await;
    match duplicate {
        Err(RepositoryError::UniqueViolation { constraint, .. }) => {
            assert_eq!(constraint, "rfqs_rfq_number_key")
        }
        other => panic!("expected unique violation, got {:?}", other),
    }

    let second_rfq_for_brief = uow.rfqs().add(rfq_for(&first, "RFQ-2026-002")).await;
    assert!(matches!(second_rfq_for_brief, Err(RepositoryError::UniqueViolation { .. })));

    let orphan = uow.rfqs().add(rfq_for(&brief("Ghost"), "RFQ-2026-003")).await;
    assert!(matches!(orphan, Err(RepositoryError::ForeignKeyViolation { .. })));
}

#[tokio::test]
async fn test_rollback_discards_and_commit_publishes() {
    let db = InMemoryDatabase::new();

    let uow = db.unit_of_work();
    uow.begin_transaction().await.unwrap();
    uow.product_briefs().add(brief("Lentils")).await.unwrap();
    assert!(uow.in_transaction().await);
    uow.rollback().await.unwrap();
    assert_eq!(uow.product_briefs().count(None).await.unwrap(), 0);

    uow.begin_transaction().await.unwrap();
    let kept = uow.product_briefs().add(brief("Chickpeas")).await.unwrap();
    uow.commit().await.unwrap();
    assert!(!uow.in_transaction().await);

    let reader = db.unit_of_work();
    assert_eq!(reader.product_briefs().get_by_id(kept.id).await.unwrap(), Some(kept));
}

#[tokio::test]
async fn test_transaction_policy_errors() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    assert!(matches!(uow.commit().await, Err(RepositoryError::NoActiveTransaction)));
    assert!(matches!(uow.rollback().await, Err(RepositoryError::NoActiveTransaction)));

    uow.begin_transaction().await.unwrap();
    assert!(matches!(
        uow.begin_transaction().await,
        Err(RepositoryError::TransactionAlreadyActive)
    ));
    uow.rollback().await.unwrap();
}

#[tokio::test]
async fn test_dropping_unit_of_work_rolls_back() {
    let db = InMemoryDatabase::new();
    {
        let uow = db.unit_of_work();
        uow.begin_transaction().await.unwrap();
        uow.product_briefs().add(brief("Millet")).await.unwrap();
    }

    let reader = db.unit_of_work();
    assert_eq!(reader.product_briefs().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_repositories_are_cached_per_unit_of_work() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    let a = uow.products();
    let b = uow.products();
    let _ = uow.rfqs();

    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(uow.cached_repositories(), 2);
}

#[tokio::test]
async fn test_find_with_is_active_returns_only_active_rows() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();
    let products = uow.products();

    products.add(product("Quinoa", Some("QN-1"), true)).await.unwrap();
    products.add(product("Barley", Some("BR-1"), false)).await.unwrap();
    products.add(product("Quinoa Flakes", None, true)).await.unwrap();

    let active = products
        .find(field("is_active").eq(true).and(field("name").contains("quinoa")))
        .await
        .unwrap();

    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|p| p.is_active));
}

#[tokio::test]
async fn test_sku_uniqueness_excludes_the_edited_product() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();
    let products = uow.products();

    let quinoa = products.add(product("Quinoa", Some("QN-1"), true)).await.unwrap();

    assert!(!products.is_sku_unique("QN-1", None).await.unwrap());
    assert!(products.is_sku_unique("QN-1", Some(quinoa.id)).await.unwrap());
    assert!(products.is_sku_unique("QN-2", None).await.unwrap());

    let clash = products.add(product("Quinoa copy", Some("QN-1"), true)).await;
    assert!(matches!(clash, Err(RepositoryError::UniqueViolation { .. })));
}

#[tokio::test]
async fn test_catalog_search_and_category_counts() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();
    let products = uow.products();

    products.add(product("Red Lentils", Some("LN-1"), true)).await.unwrap();
    products.add(product("Green Lentils", Some("LN-2"), true)).await.unwrap();
    products.add(product("Old Lentils", Some("LN-3"), false)).await.unwrap();

    let found = products.search("LENTIL").await.unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Green Lentils", "Red Lentils"]);

    assert_eq!(products.search("  ").await.unwrap().len(), 2);
    assert_eq!(products.by_sku("LN-2").await.unwrap().map(|p| p.name), Some("Green Lentils".to_string()));

    let counts = products.count_by_category().await.unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].count, 2);
}

#[tokio::test]
async fn test_delete_supplier_sets_product_supplier_to_null() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    let supplier = uow
        .suppliers()
        .add(Supplier::new(
            SupplierInput {
                company_name: "Andes Grains".into(),
                email: "sales@andes.example".into(),
                ..Default::default()
            },
            Utc::now(),
        ))
        .await
        .unwrap();

    let mut item = product("Quinoa", Some("QN-9"), true);
    item.supplier_id = Some(supplier.id);
    let item = uow.products().add(item).await.unwrap();

    uow.suppliers().delete(supplier.id).await.unwrap();

    let reloaded = uow.products().get_by_id(item.id).await.unwrap().unwrap();
    assert_eq!(reloaded.supplier_id, None);
}

#[tokio::test]
async fn test_restricted_delete_leaves_everything_in_place() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();
    let now = Utc::now();

    let buyer = uow
        .buyers()
        .add(Buyer::new(
            BuyerInput {
                company_name: "Fresh Market".into(),
                email: "buying@fresh.example".into(),
                ..Default::default()
            },
            now,
        ))
        .await
        .unwrap();

    uow.orders()
        .add(Order {
            id: Uuid::new_v4(),
            order_number: "ORD-20260101-0001".into(),
            buyer_id: buyer.id,
            supplier_id: None,
            status: OrderStatus::Pending,
            total_amount: 0.0,
            currency: "USD".into(),
            order_date: now,
            delivery_date: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: None,
        })
        .await
        .unwrap();

    let result = uow.buyers().delete(buyer.id).await;
    assert!(matches!(result, Err(RepositoryError::ForeignKeyViolation { .. })));
    assert!(uow.buyers().get_by_id(buyer.id).await.unwrap().is_some());
    assert_eq!(uow.orders().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_unknown_row_is_not_found() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    let result = uow.product_briefs().update(brief("Never stored")).await;
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
}

#[tokio::test]
async fn test_unknown_field_is_rejected() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    let result = uow.products().find(field("colour").eq("red")).await;
    assert!(matches!(result, Err(RepositoryError::UnknownField { .. })));

    let result = uow.products().query(Query::new().order_by_asc("colour")).await;
    assert!(matches!(result, Err(RepositoryError::UnknownField { .. })));
}

#[tokio::test]
async fn test_workflow_lookups() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();

    let mut tagged = brief("Buckwheat");
    tagged.correlation_id = Some("req-42".into());
    let tagged = uow.product_briefs().add(tagged).await.unwrap();
    let rfq = uow.rfqs().add(rfq_for(&tagged, "RFQ-2026-007")).await.unwrap();
    let project = uow.projects().add(project_for(&rfq, "PRJ-2026-007")).await.unwrap();

    assert_eq!(uow.product_briefs().by_correlation_id("req-42").await.unwrap(), Some(tagged.clone()));
    assert_eq!(uow.rfqs().by_brief(tagged.id).await.unwrap(), Some(rfq.clone()));
    assert_eq!(uow.projects().by_rfq(rfq.id).await.unwrap(), Some(project));
    assert_eq!(uow.rfqs().last_sequence("RFQ-2026-").await.unwrap(), 7);
    assert_eq!(uow.rfqs().last_sequence("RFQ-2025-").await.unwrap(), 0);
    assert_eq!(uow.projects().last_sequence("PRJ-2026-").await.unwrap(), 7);
    assert_eq!(uow.product_briefs().by_user("buyer-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_paging_reports_totals() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();
    for i in 0..5 {
        uow.products()
            .add(product(&format!("Product {}", i), None, true))
            .await
            .unwrap();
    }

    let page = uow
        .products()
        .page(Query::new().order_by_asc("name"), 2, 2)
        .await
        .unwrap();

    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Product 2", "Product 3"]);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let db = InMemoryDatabase::new();
    let uow = db.unit_of_work();
    uow.products().add(product("Quinoa", None, true)).await.unwrap();

    let page = uow.products().page(Query::new(), i64::MAX, 50).await.unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);
    assert_eq!(page.page, i64::MAX);
    assert_eq!(page.total_pages, 1);
}
