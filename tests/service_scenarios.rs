use snapdex::{
    Document,
    Error,
    IndexService,
    Operation,
    PageRequest,
    Predicate,
    Query,
    ServiceConfig,
    SortSpec,
    seed,
};

fn seeded() -> IndexService {
    let service = IndexService::open_in_ram(&ServiceConfig::default()).unwrap();
    service.upsert(seed::numbered_documents(1..=1000)).unwrap();
    service
}

fn ids(page: &snapdex::SearchPage) -> Vec<String> {
    page.documents
        .iter()
        .map(|d| d.text("id").unwrap().to_string())
        .collect()
}

#[test]
fn second_page_of_wildcard_search() {
    let service = seeded();

    let page = service.search_text("Document*", "title", 2, 100, None).unwrap();
    assert_eq!(page.documents.len(), 100);
    assert_eq!(page.total_matches, 1000);

    assert_eq!(service.count_text("title", "Document*").unwrap(), 1000);
}

#[test]
fn sorted_second_page_by_id() {
    let service = seeded();

    let page = service
        .search_text("Document*", "title", 2, 100, Some(SortSpec::asc("id")))
        .unwrap();
    let got = ids(&page);
    assert_eq!(got.len(), 100);

    // Ids sort as strings: "1", "10", "100", "1000", "101", ...
    let mut all: Vec<String> = (1..=1000).map(|i| i.to_string()).collect();
    all.sort();
    assert_eq!(got, all[100..200]);
}

#[test]
fn multi_value_match() {
    let service = seeded();

    let page = service
        .search_any(
            &["Document100", "Document101", "Document202"],
            "title",
            1,
            10,
            Some(SortSpec::asc("id")),
        )
        .unwrap();
    assert_eq!(ids(&page), ["100", "101", "202"]);
}

#[test]
fn update_single_document() {
    let service = seeded();

    service
        .apply_batch(&[Operation::Upsert(
            Document::new().with("id", "1").with("title", "updateTest01"),
        )])
        .unwrap();

    let page = service.search_text("updateTest01", "title", 1, 10, None).unwrap();
    assert_eq!(ids(&page), ["1"]);
    assert_eq!(service.count_text("id", "1").unwrap(), 1);
    assert_eq!(service.count_text("title", "Document*").unwrap(), 999);
}

#[test]
fn update_many_documents() {
    let service = seeded();

    let docs = (0..100)
        .map(|i| {
            Document::new()
                .with("id", i.to_string())
                .with("title", format!("updateTest02{i}"))
        })
        .collect();
    service.upsert(docs).unwrap();

    let page = service.search_text("updateTest02*", "title", 10, 10, None).unwrap();
    assert_eq!(page.documents.len(), 10);
    assert_eq!(page.total_matches, 100);
    // Ids 1..=99 were replaced, 0 is new.
    assert_eq!(service.count(&Predicate::All).unwrap(), 1001);
}

#[test]
fn upsert_keeps_one_document_per_id() {
    let service = seeded();

    for value in ["first", "second", "third"] {
        service
            .upsert(vec![Document::new().with("id", "42").with("title", value)])
            .unwrap();
    }

    let page = service.search_text("42", "id", 1, 10, None).unwrap();
    assert_eq!(page.total_matches, 1);
    assert_eq!(page.documents[0].text("title"), Some("third"));
}

#[test]
fn repeating_a_batch_is_idempotent() {
    let service = seeded();
    let batch: Vec<_> = seed::numbered_documents(1..=10)
        .into_iter()
        .map(Operation::Upsert)
        .collect();

    service.apply_batch(&batch).unwrap();
    let before = service.count(&Predicate::All).unwrap();
    service.apply_batch(&batch).unwrap();

    assert_eq!(service.count(&Predicate::All).unwrap(), before);
    for i in 1..=10 {
        assert_eq!(service.count_text("id", &i.to_string()).unwrap(), 1);
    }
}

#[test]
fn count_equals_unbounded_search_total() {
    let service = seeded();
    let predicate = Predicate::parse("Document9*", "title");

    let count = service.count(&predicate).unwrap();
    let page = service
        .search(&Query::new(predicate), PageRequest::everything())
        .unwrap();

    assert_eq!(count, 111);
    assert_eq!(page.total_matches, count);
    assert_eq!(page.documents.len(), count);
}

#[test]
fn zero_page_size_returns_nothing() {
    let service = seeded();

    let page = service.search_text("Document*", "title", 1, 0, None).unwrap();
    assert!(page.documents.is_empty());
}

#[test]
fn page_beyond_results_returns_nothing() {
    let service = seeded();

    let page = service.search_text("Document*", "title", 11, 100, None).unwrap();
    assert!(page.documents.is_empty());
    assert_eq!(page.total_matches, 1000);
}

#[test]
fn page_well_past_the_end_returns_nothing() {
    let service = seeded();

    for page_number in [12, 50] {
        let page = service
            .search_text("Document*", "title", page_number, 100, None)
            .unwrap();
        assert!(page.documents.is_empty());
        assert_eq!(page.total_matches, 1000);
    }
}

#[test]
fn wildcards_inside_query_strings() {
    let service = seeded();

    // 1, 10..=19, 100..=199 and 1000.
    assert_eq!(service.count_text("title", "title:Document1*").unwrap(), 112);
    assert_eq!(
        service.count_text("title", "Document1* Document2*").unwrap(),
        223
    );

    let page = service
        .search_text(
            "title:Document99*",
            "status",
            1,
            20,
            Some(SortSpec::asc("id")),
        )
        .unwrap();
    assert_eq!(ids(&page), [
        "99", "990", "991", "992", "993", "994", "995", "996", "997", "998",
        "999",
    ]);
}

#[test]
fn unknown_default_field_still_checks_syntax() {
    let service = seeded();

    let err = service.count_text("nosuchfield", "title:(").unwrap_err();
    assert!(matches!(err, Error::QuerySyntax(_)));
    assert_eq!(service.count_text("nosuchfield", "plain").unwrap(), 0);
}

#[test]
fn no_matches_is_not_an_error() {
    let service = seeded();

    let page = service.search_text("nothinglikethis", "title", 1, 10, None).unwrap();
    assert!(page.documents.is_empty());
    assert_eq!(page.total_matches, 0);
    assert_eq!(service.count_text("no_such_field", "x").unwrap(), 0);
}

#[test]
fn malformed_query_is_reported() {
    let service = seeded();

    let err = service
        .search_text("bogus_field:Document1", "title", 1, 10, None)
        .unwrap_err();
    assert!(matches!(err, Error::QuerySyntax(_)));
}

#[test]
fn delete_removes_document() {
    let service = seeded();

    service
        .apply_batch(&[Operation::Delete { id: "500".into() }])
        .unwrap();

    assert_eq!(service.count_text("id", "500").unwrap(), 0);
    assert_eq!(service.count(&Predicate::All).unwrap(), 999);
}

#[test]
fn reopening_from_disk_keeps_documents() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("index");
    let config = ServiceConfig::default();

    {
        let service = IndexService::open(&dir, &config).unwrap();
        service.upsert(seed::numbered_documents(1..=20)).unwrap();
    }

    let service = IndexService::open(&dir, &config).unwrap();
    assert_eq!(service.generation(), 0);
    assert_eq!(service.count_text("title", "Document*").unwrap(), 20);
}

#[test]
fn second_writer_on_same_directory_fails_to_open() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("index");
    let config = ServiceConfig::default();

    let _first = IndexService::open(&dir, &config).unwrap();
    let err = IndexService::open(&dir, &config).unwrap_err();
    assert!(matches!(err, Error::StorageOpen { .. }));
}
