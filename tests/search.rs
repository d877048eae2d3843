// Boolean search semantics over a loaded catalog.
mod support;
#[path = "support/common.rs"]
mod common;

use anyhow::Result;
use pocdex::CatalogService;
use std::collections::BTreeSet;

use common::{DefinitionTree, Harness};

fn names(service: &CatalogService) -> BTreeSet<String> {
    service.catalog().view().map(|r| r.display_name()).collect()
}

fn matching(service: &CatalogService, term: &str) -> BTreeSet<String> {
    let term = term.to_lowercase();
    service
        .catalog()
        .records()
        .iter()
        .filter(|r| r.raw_text().to_lowercase().contains(&term))
        .map(|r| r.display_name())
        .collect()
}

fn fixture() -> DefinitionTree {
    let tree = DefinitionTree::new();
    tree.write_poc("a.yaml", "apache-rce", "critical", "rce,apache");
    tree.write_poc("b.yaml", "nginx-leak", "critical", "exposure");
    tree.write_poc("c.yaml", "struts-RCE", "high", "struts");
    tree.write_poc("d.yaml", "wp-info", "info", "wordpress");
    tree.write_poc("nested/e.yaml", "jira-ssrf", "medium", "ssrf,jira");
    tree
}

#[test]
fn and_query_is_intersection_or_query_is_union() -> Result<()> {
    let tree = fixture();
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;

    let critical = matching(&service, "critical");
    let rce = matching(&service, "rce");

    service.search("critical AND rce");
    let and_view = names(&service);
    assert_eq!(and_view, critical.intersection(&rce).cloned().collect());
    assert_eq!(and_view, BTreeSet::from(["a.yaml".to_string()]));

    service.search("critical OR rce");
    let or_view = names(&service);
    assert_eq!(or_view, critical.union(&rce).cloned().collect());
    assert_eq!(or_view.len(), 3);
    Ok(())
}

#[test]
fn every_query_shape_matches_manual_evaluation() -> Result<()> {
    let tree = fixture();
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;

    let queries = [
        ("jira", vec!["jira"], true),
        ("JIRA ssrf", vec!["jira", "ssrf"], true),
        ("info OR medium", vec!["info", "medium"], false),
        ("https AND exposure", vec!["https", "exposure"], true),
        ("nothing-matches OR BaseURL", vec!["nothing-matches", "baseurl"], false),
    ];
    for (query, terms, all) in queries {
        service.search(query);
        let mut expected: Option<BTreeSet<String>> = None;
        for term in terms {
            let hits = matching(&service, term);
            expected = Some(match expected {
                None => hits,
                Some(acc) if all => acc.intersection(&hits).cloned().collect(),
                Some(acc) => acc.union(&hits).cloned().collect(),
            });
        }
        assert_eq!(names(&service), expected.unwrap_or_default(), "query {query}");
    }
    Ok(())
}

#[test]
fn search_resets_page_and_empty_query_restores_catalog() -> Result<()> {
    let tree = DefinitionTree::new();
    for i in 0..60 {
        let severity = if i % 2 == 0 { "high" } else { "low" };
        tree.write_poc(&format!("p{i:02}.yaml"), &format!("p{i:02}"), severity, "bulk");
    }
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;
    assert!(service.next_page());
    assert_eq!(service.page().number, 2);

    assert_eq!(service.search("severity: high"), 30);
    assert_eq!(service.page().number, 1);
    assert_eq!(service.page().total_pages, 1);

    assert_eq!(service.search("   "), 60);
    assert!(service.catalog().query().is_none());
    assert_eq!(service.page().total_pages, 2);

    service.search("low");
    service.reset_search();
    assert_eq!(service.catalog().view_len(), 60);
    Ok(())
}

#[test]
fn search_covers_request_body_not_only_info() -> Result<()> {
    let tree = fixture();
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;
    // Paths only appear inside the request block.
    assert_eq!(service.search("{{BaseURL}}/jira-ssrf"), 1);
    assert_eq!(service.search("matchers"), 5);
    Ok(())
}
