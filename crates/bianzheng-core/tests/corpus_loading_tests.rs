use bianzheng_core::{
    load_records, CatalogValidator, ElementCategory, FsSource, LoadReport, PatternCatalog,
    Subcategory, SyndromeElement, SyndromePattern, ZhengsuRegistry,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

fn seed_corpus(root: &Path) {
    let zhengsu = root.join("zhengsu");
    write(
        &zhengsu,
        "fei.json",
        r#"{"id":"fei","name":"肺","category":"病位","subcategory":"五臟"}"#,
    );
    write(
        &zhengsu,
        "qi_xu.json",
        r#"{"id":"qi_xu","name":"氣虛","category":"病性","subcategory":"氣機病變","treatment":"補氣"}"#,
    );
    write(
        &zhengsu,
        "qi_tuo.json",
        r#"{"id":"qi_tuo","name":"氣脫","category":"病性","subcategory":"氣機病變","is_critical":true}"#,
    );
    write(&zhengsu, "_template.json", r#"{"id":"template"}"#);
    write(&zhengsu, "broken.json", r#"{"id":"broken""#);

    let zhengxing = root.join("zhengxing");
    write(
        &zhengxing,
        "feiqixu.json",
        r#"{"id":"feiqixu","name":"肺氣虛證",
            "zhengsu_composition":{"location":["fei"],"nature":["qi_xu"]},
            "symptoms":{"main":["咳喘無力"]},"treatment_principle":["補肺益氣"],
            "can_evolve_to":["qituozheng"]}"#,
    );
    write(
        &zhengxing,
        "qituozheng.json",
        r#"{"id":"qituozheng","name":"氣脫證",
            "zhengsu_composition":{"nature":["qi_tuo"]},
            "symptoms":{"main":["汗出不止"]},"treatment_principle":["益氣固脫"],
            "evolved_from":["feiqixu"]}"#,
    );
    write(
        &zhengxing,
        "incomplete.json",
        r#"{"id":"incomplete","name":"缺","zhengsu_composition":{"nature":["qi_xu"]}}"#,
    );
}

#[tokio::test]
async fn test_load_registry_and_catalog_from_directory() {
    let tmp = TempDir::new().unwrap();
    seed_corpus(tmp.path());
    let source = FsSource::new(tmp.path());

    let elements: LoadReport<SyndromeElement> = load_records(&source, "zhengsu", &[]).await;
    assert_eq!(elements.records.len(), 3);
    assert_eq!(elements.skipped.len(), 1);
    assert_eq!(elements.skipped[0].name, "broken.json");

    let patterns: LoadReport<SyndromePattern> = load_records(&source, "zhengxing", &[]).await;
    assert_eq!(patterns.records.len(), 2);
    assert_eq!(patterns.skipped[0].name, "incomplete.json");

    let registry = ZhengsuRegistry::new(elements.records);
    let catalog = PatternCatalog::new(patterns.records);

    assert_eq!(registry.by_category(ElementCategory::Location).len(), 1);
    assert_eq!(registry.by_subcategory(Subcategory::QiDynamic).len(), 2);
    assert_eq!(registry.treatment_for("qi_xu"), Some("補氣"));
    assert_eq!(registry.treatment_for("fei"), None);

    let qituo = catalog.get("qituozheng").unwrap();
    assert!(PatternCatalog::is_critical(qituo, &registry));
    assert_eq!(
        PatternCatalog::composition_summary(catalog.get("feiqixu").unwrap(), &registry),
        "肺 + 氣虛"
    );

    let report = CatalogValidator::new(&registry, &catalog).run();
    assert!(!report.has_errors());
    assert!(report.warnings.is_empty());
    assert!(report.info.is_empty());
}

#[tokio::test]
async fn test_explicit_file_list_preserves_request_order() {
    let tmp = TempDir::new().unwrap();
    seed_corpus(tmp.path());
    let source = FsSource::new(tmp.path());

    let names = vec!["qi_tuo.json".to_string(), "fei.json".to_string()];
    let elements: LoadReport<SyndromeElement> = load_records(&source, "zhengsu", &names).await;
    let ids: Vec<_> = elements.records.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["qi_tuo", "fei"]);
}

#[tokio::test]
async fn test_missing_collection_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    let source = FsSource::new(tmp.path());
    let elements: LoadReport<SyndromeElement> = load_records(&source, "zhengsu", &[]).await;
    assert!(elements.records.is_empty());
}
