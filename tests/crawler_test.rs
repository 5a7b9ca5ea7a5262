mod common;

use common::{fast_timeouts, portal_url, FakeBrowser, FlakyStore, CATALOG_IDS};
use serde_json::{json, Map};
use std::sync::Arc;

use uerj_scraper::browser::NavigationDriver;
use uerj_scraper::storage::{Collection, DocumentStore, InMemoryDocumentStore};
use uerj_scraper::{CatalogCrawler, Credentials, Reconciler, ScraperError};

fn credentials() -> Credentials {
    Credentials::new("201910012345", "segredo")
}

fn crawler(browser: FakeBrowser, store: Arc<dyn DocumentStore>) -> CatalogCrawler {
    let driver = NavigationDriver::new(Box::new(browser), fast_timeouts());
    CatalogCrawler::new(driver, Reconciler::new(store), portal_url())
}

#[tokio::test]
async fn test_full_crawl_enriches_and_persists_every_entry() {
    let store = InMemoryDocumentStore::new();
    let report = crawler(FakeBrowser::new(), Arc::new(store.clone()))
        .run(&credentials())
        .await
        .unwrap();

    assert_eq!(report.disciplines.len(), 10);
    assert_eq!(report.enriched, 10);
    assert_eq!(report.persisted, 10);
    assert!(report.enrichment_failures.is_empty());
    assert!(report.finished_at >= report.started_at);

    let ids: Vec<_> = report
        .disciplines
        .iter()
        .map(|d| d.discipline_id.clone().unwrap())
        .collect();
    assert_eq!(ids, CATALOG_IDS);

    let first = &report.disciplines[0];
    assert_eq!(first.name, "CÁLCULO I");
    assert_eq!(first.credits, 4);
    assert_eq!(first.total_hours, 60);

    let requirements = first.requirements.as_ref().unwrap();
    assert_eq!(requirements.len(), 2);
    assert_eq!(requirements[0].kind, "Pré-Requisito");
    assert_eq!(requirements[0].description, "CÁLCULO I");

    let classes = first.classes.as_ref().unwrap();
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].number, 1);
    assert_eq!(classes[0].preferential.as_deref(), Some("NÃO"));
    assert_eq!(classes[0].times.as_deref(), Some("2M12 4M12"));
    assert_eq!(classes[0].teacher.as_deref(), Some("MARIA SOUZA"));
    assert_eq!(classes[0].offered_uerj, 40);
    assert_eq!(classes[0].occupied_uerj, 35);
    assert_eq!(classes[0].offered_vestibular, 10);
    assert_eq!(classes[0].occupied_vestibular, 8);
    assert_eq!(classes[0].request_uerj_offered, 5);
    assert_eq!(classes[0].request_uerj_total, 12);
    assert_eq!(classes[0].request_uerj_preferential, 3);
    assert_eq!(classes[0].request_vestibular_offered, 2);
    assert_eq!(classes[0].request_vestibular_total, 4);
    assert_eq!(classes[0].request_vestibular_preferential, 1);
    assert_eq!(classes[1].number, 2);
    assert_eq!(classes[1].request_uerj_total, 0);

    let stored = store
        .find_by_key(Collection::Disciplines, "10843")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["name"], json!("FÍSICA I"));
    assert_eq!(stored["classes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_detail_timeout_on_one_entry_does_not_stop_the_crawl() {
    let store = InMemoryDocumentStore::new();
    let browser = FakeBrowser::new().stalling_on(&["10843"]);
    let calls = browser.calls();

    let report = crawler(browser, Arc::new(store.clone()))
        .run(&credentials())
        .await
        .unwrap();

    assert_eq!(report.disciplines.len(), 10);
    assert_eq!(report.enriched, 9);
    assert_eq!(report.enrichment_failures, vec!["10843".to_string()]);

    for (i, discipline) in report.disciplines.iter().enumerate() {
        if i == 2 {
            assert!(!discipline.is_enriched());
            assert_eq!(discipline.name, "FÍSICA I");
        } else {
            assert!(discipline.is_enriched(), "{} should be enriched", discipline.label());
        }
    }

    // List-level fields are persisted without detail keys
    let stored = store
        .find_by_key(Collection::Disciplines, "10843")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.get("classes").is_none());
    assert!(stored.get("requirements").is_none());

    // Navigation resynchronized after the stalled entry
    let calls = calls.lock().unwrap();
    let backs = calls.iter().filter(|c| c.as_str() == "back").count();
    assert_eq!(backs, 10);
    assert_eq!(calls.last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn test_row_without_detail_link_keeps_list_fields_only() {
    let store = InMemoryDocumentStore::new();
    let browser = FakeBrowser::new().with_catalog("catalog_unlinked_row.html");
    let calls = browser.calls();

    let report = crawler(browser, Arc::new(store.clone()))
        .run(&credentials())
        .await
        .unwrap();

    assert_eq!(report.disciplines.len(), 11);
    assert_eq!(report.enriched, 10);
    assert_eq!(report.persisted, 10);
    assert!(report.enrichment_failures.is_empty());

    let unlinked = report.disciplines.last().unwrap();
    assert_eq!(unlinked.name, "ATIVIDADES COMPLEMENTARES");
    assert_eq!(unlinked.discipline_id, None);
    assert_eq!(unlinked.total_hours, 200);
    assert!(!unlinked.is_enriched());

    {
        let calls = calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|c| c.starts_with("script ")).count(), 10);
        assert_eq!(calls.iter().filter(|c| c.as_str() == "back").count(), 10);
    }

    assert_eq!(store.write_count(), 10);
    let stored = store.find_all(Collection::Disciplines).await.unwrap();
    assert!(stored
        .iter()
        .all(|doc| doc["name"] != json!("ATIVIDADES COMPLEMENTARES")));
}

#[tokio::test]
async fn test_rejected_login_aborts_without_touching_the_store() {
    let store = InMemoryDocumentStore::new();
    let browser = FakeBrowser::new().rejecting_login();
    let calls = browser.calls();

    let result = crawler(browser, Arc::new(store.clone()))
        .run(&credentials())
        .await;

    assert!(matches!(result, Err(ScraperError::FatalCrawl { .. })));
    assert!(store.operations().is_empty());
    assert_eq!(
        calls.lock().unwrap().last().map(String::as_str),
        Some("close")
    );
}

#[tokio::test]
async fn test_list_that_never_comes_back_is_fatal() {
    let store = InMemoryDocumentStore::new();
    let result = crawler(FakeBrowser::new().stalling_on_back(), Arc::new(store.clone()))
        .run(&credentials())
        .await;

    assert!(matches!(result, Err(ScraperError::FatalCrawl { .. })));
    // Only the first entry was reached
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_failed_write_is_counted_and_the_crawl_continues() {
    let inner = InMemoryDocumentStore::new();
    let store = FlakyStore::new(inner.clone(), &["10845"]);

    let report = crawler(FakeBrowser::new(), Arc::new(store))
        .run(&credentials())
        .await
        .unwrap();

    assert_eq!(report.disciplines.len(), 10);
    assert_eq!(report.persisted, 9);
    assert_eq!(report.failed_writes, vec!["10845".to_string()]);
    assert!(inner
        .find_by_key(Collection::Disciplines, "10845")
        .await
        .unwrap()
        .is_none());
    assert_eq!(inner.find_all(Collection::Disciplines).await.unwrap().len(), 9);
}

#[tokio::test]
async fn test_annotations_survive_a_rescrape() {
    let store = InMemoryDocumentStore::new();
    crawler(FakeBrowser::new(), Arc::new(store.clone()))
        .run(&credentials())
        .await
        .unwrap();

    // An operator annotates class 2 of CÁLCULO I
    let stored = store
        .find_by_key(Collection::Disciplines, "10841")
        .await
        .unwrap()
        .unwrap();
    let mut classes = stored["classes"].clone();
    classes[1]["whatsappGroup"] = json!("https://chat.whatsapp.com/calc1-t2");
    let mut fields = Map::new();
    fields.insert("classes".to_string(), classes);
    store
        .update_one(Collection::Disciplines, "10841", fields)
        .await
        .unwrap();
    store.clear_operations();

    // Same portal content: nothing to write
    crawler(FakeBrowser::new(), Arc::new(store.clone()))
        .run(&credentials())
        .await
        .unwrap();
    assert_eq!(store.write_count(), 0);

    // A stalled detail page must not erase the annotation either
    crawler(FakeBrowser::new().stalling_on(&["10841"]), Arc::new(store.clone()))
        .run(&credentials())
        .await
        .unwrap();

    let stored = store
        .find_by_key(Collection::Disciplines, "10841")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored["classes"][1]["whatsappGroup"],
        json!("https://chat.whatsapp.com/calc1-t2")
    );
    assert!(stored["classes"][0].get("whatsappGroup").is_none());
}

#[tokio::test]
async fn test_scrape_all_returns_only_disciplines() {
    let store = InMemoryDocumentStore::new();
    let disciplines = crawler(FakeBrowser::new(), Arc::new(store))
        .scrape_all(&credentials())
        .await
        .unwrap();
    assert_eq!(disciplines.len(), 10);
}
