//! Shared test utilities for tender-db tests.

pub(crate) mod helpers {
    use tender_core::entities::{Estimate, Offer, Project};
    use tender_core::enums::{OfferItemOrigin, OfferItemSource};
    use tender_core::requests::{
        EstimateImport, EstimateItemInput, OfferImport, OfferItemInput, PriceListItemInput,
    };
    use tender_core::entities::WbsLevels;
    use tender_recon::ReconSettings;

    use crate::TenderDb;
    use crate::service::TenderService;

    /// In-memory service with default engine settings.
    pub async fn test_service() -> TenderService {
        let db = TenderDb::open_local(":memory:").await.unwrap();
        TenderService::from_db(db, ReconSettings::default())
    }

    pub async fn test_project(svc: &TenderService) -> Project {
        svc.create_project("Test project", None).await.unwrap()
    }

    pub fn catalog_entry(code: &str, description: &str, price: f64) -> PriceListItemInput {
        PriceListItemInput {
            code: code.into(),
            description: description.into(),
            unit: Some("m2".into()),
            price,
        }
    }

    pub fn estimate_line(
        progressive: i64,
        code: &str,
        quantity: f64,
        unit_price: f64,
        levels: &[Option<&str>],
    ) -> EstimateItemInput {
        EstimateItemInput {
            progressive: Some(progressive),
            code: Some(code.into()),
            description: None,
            unit: Some("m2".into()),
            quantity,
            unit_price,
            amount: None,
            price_list_code: Some(code.into()),
            wbs: WbsLevels::from_values(levels),
        }
    }

    /// Baseline with three catalog entries and three lines:
    /// `#1 A1` and `#2 B1` under `1`, `#3 C1` under `2`.
    pub fn baseline_bundle(name: &str) -> EstimateImport {
        EstimateImport {
            name: name.into(),
            is_baseline: true,
            price_list_name: Some("Regional 2026".into()),
            price_list: vec![
                catalog_entry("A1", "Concrete slab", 100.0),
                catalog_entry("B1", "Steel rebar", 2.0),
                catalog_entry("C1", "Excavation trench", 15.0),
            ],
            items: vec![
                estimate_line(1, "A1", 10.0, 100.0, &[Some("1"), Some("1.1")]),
                estimate_line(2, "B1", 500.0, 2.0, &[Some("1"), Some("1.2")]),
                estimate_line(3, "C1", 40.0, 15.0, &[Some("2")]),
            ],
        }
    }

    pub async fn test_baseline(svc: &TenderService, project: &Project) -> Estimate {
        svc.import_estimate(&project.id, &baseline_bundle("Computo"))
            .await
            .unwrap()
            .estimate
    }

    pub fn detailed_line(progressive: i64, code: &str, quantity: f64, unit_price: f64) -> OfferItemInput {
        OfferItemInput {
            origin: OfferItemOrigin::Baseline,
            source: OfferItemSource::Detailed,
            progressive: Some(progressive),
            code: Some(code.into()),
            description: None,
            unit: None,
            quantity,
            unit_price,
            amount: None,
            price_list_item_id: None,
        }
    }

    pub fn aggregated_line(code: &str, description: Option<&str>, quantity: f64, unit_price: f64) -> OfferItemInput {
        OfferItemInput {
            origin: OfferItemOrigin::Baseline,
            source: OfferItemSource::Aggregated,
            progressive: None,
            code: Some(code.into()),
            description: description.map(String::from),
            unit: None,
            quantity,
            unit_price,
            amount: None,
            price_list_item_id: None,
        }
    }

    pub async fn test_offer(
        svc: &TenderService,
        estimate: &Estimate,
        company: &str,
        items: Vec<OfferItemInput>,
    ) -> Offer {
        let bundle = OfferImport {
            company: company.into(),
            round: 1,
            items,
        };
        svc.import_offer(&estimate.id, &bundle).await.unwrap().offer
    }

    /// Count rows of a table, for cascade and rollback checks.
    pub async fn count_rows(svc: &TenderService, table: &str) -> i64 {
        let mut rows = svc
            .db()
            .conn()
            .query(&format!("SELECT COUNT(*) FROM {table}"), ())
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
    }
}
