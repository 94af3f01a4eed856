//! Integration tests for Paper Finder
//!
//! These tests drive the resolver end to end against mock providers, and
//! against mock HTTP servers through the real adapters.

use paper_finder::config::{Config, ProviderOverride};
use paper_finder::models::{AttemptOutcome, PaperMetadata};
use paper_finder::resolver::{
    reconciler, OrchestratorConfig, ResolutionOutcome, ResolveError, Resolver, StatsCollector,
};
use paper_finder::sources::mock::make_metadata;
use paper_finder::sources::{MockSource, ProviderRegistry, ProviderSpec, RegistryError, TierKind};
use std::sync::Arc;
use std::time::Duration;

const NUMPY_DOI: &str = "10.1038/s41586-020-2649-2";

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        budget: Duration::from_secs(5),
        grace_period: Duration::from_millis(100),
        enrich_metadata: true,
    }
}

fn spec(id: &str, tier: TierKind) -> ProviderSpec {
    ProviderSpec::new(id, tier)
}

fn numpy_metadata() -> PaperMetadata {
    make_metadata("Array programming with NumPy", "Nature", 2020)
}

#[tokio::test]
async fn scenario_a_tier_one_link_with_full_metadata() {
    let unpaywall = Arc::new(MockSource::with_link(
        "unpaywall",
        "https://www.nature.com/articles/s41586-020-2649-2.pdf",
        numpy_metadata(),
    ));
    let arxiv = Arc::new(MockSource::with_link(
        "arxiv",
        "https://arxiv.org/pdf/2006.10256",
        numpy_metadata(),
    ));
    let crossref = Arc::new(MockSource::with_metadata("crossref", numpy_metadata()));

    let registry = ProviderRegistry::builder()
        .provider(spec("unpaywall", TierKind::OpenAccess), unpaywall.clone())
        .provider(spec("arxiv", TierKind::Preprint), arxiv.clone())
        .provider(spec("crossref", TierKind::MetadataOnly), crossref.clone())
        .build()
        .unwrap();
    let resolver = Resolver::new(registry, fast_config());

    let resolution = resolver.handle(NUMPY_DOI).await.unwrap();
    let response = resolution.to_response();

    assert_eq!(resolution.outcome, ResolutionOutcome::LinkFound);
    assert_eq!(
        response.pdf_link.as_deref(),
        Some("https://www.nature.com/articles/s41586-020-2649-2.pdf")
    );
    assert_eq!(response.source.as_deref(), Some("unpaywall"));
    assert_eq!(response.message, "Paper found!");
    assert_eq!(response.logs.len(), 1);
    assert_eq!(
        response.metadata.unwrap().title.as_deref(),
        Some("Array programming with NumPy")
    );
    assert_eq!(arxiv.calls(), 0);
    assert_eq!(crossref.calls(), 0);
}

#[tokio::test]
async fn scenario_b_nothing_found_anywhere() {
    let ids = [
        ("unpaywall", TierKind::OpenAccess),
        ("core", TierKind::OpenAccess),
        ("arxiv", TierKind::Preprint),
        ("doi_org", TierKind::Publisher),
        ("crossref", TierKind::MetadataOnly),
    ];
    let mut builder = ProviderRegistry::builder();
    for (id, tier) in ids {
        builder = builder.provider(spec(id, tier), Arc::new(MockSource::not_found(id)));
    }
    let resolver = Resolver::new(builder.build().unwrap(), fast_config());

    let resolution = resolver.handle("10.1234/closed-access").await.unwrap();

    assert_eq!(resolution.outcome, ResolutionOutcome::NoCopyFound);
    assert!(resolution.paper.full_text_link().is_none());
    assert_eq!(resolution.paper.message(), "no open-access copy found");
    assert_eq!(resolution.trace.len(), ids.len());
    assert_eq!(resolution.trace.count(AttemptOutcome::NotFound), ids.len());
}

#[tokio::test]
async fn scenario_c_tier_one_timeout_then_tier_two_link() {
    let slow = Arc::new(
        MockSource::with_link("unpaywall", "https://slow.example.org/a.pdf", numpy_metadata())
            .delay(Duration::from_secs(2)),
    );
    let arxiv = Arc::new(MockSource::with_link(
        "arxiv",
        "https://arxiv.org/pdf/2006.10256",
        numpy_metadata(),
    ));

    let registry = ProviderRegistry::builder()
        .provider(
            spec("unpaywall", TierKind::OpenAccess).timeout(Duration::from_millis(100)),
            slow,
        )
        .provider(spec("arxiv", TierKind::Preprint), arxiv)
        .build()
        .unwrap();
    let resolver = Resolver::new(registry, fast_config());

    let resolution = resolver.handle(NUMPY_DOI).await.unwrap();
    let entries = resolution.trace.entries();

    assert_eq!(resolution.paper.full_text_link(), Some("https://arxiv.org/pdf/2006.10256"));
    assert_eq!(resolution.paper.source(), Some("arxiv"));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].provider, "unpaywall");
    assert_eq!(entries[0].outcome, AttemptOutcome::Timeout);
    assert_eq!(entries[1].provider, "arxiv");
    assert_eq!(entries[1].outcome, AttemptOutcome::Found);
}

#[tokio::test]
async fn scenario_d_invalid_input_issues_no_calls() {
    let source = Arc::new(MockSource::with_link(
        "unpaywall",
        "https://example.org/a.pdf",
        numpy_metadata(),
    ));
    let registry = ProviderRegistry::builder()
        .provider(spec("unpaywall", TierKind::OpenAccess), source.clone())
        .build()
        .unwrap();
    let stats = Arc::new(StatsCollector::new());
    let resolver = Resolver::new(registry, fast_config()).with_observer(stats.clone());

    for input in ["not-a-doi", "", "   ", "11.1234/abc", "10.12/short"] {
        let err = resolver.handle(input).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidInput(_)), "{input:?}");
        assert_eq!(err.to_response().status, 400);
    }

    assert_eq!(source.calls(), 0);
    assert_eq!(stats.snapshot().processed, 0);
}

#[tokio::test]
async fn empty_found_never_wins_the_link() {
    let empty = Arc::new(MockSource::with_hit("empty", Default::default()));
    let zenodo = Arc::new(MockSource::with_link(
        "zenodo",
        "https://zenodo.org/records/1/files/paper.pdf",
        PaperMetadata::default(),
    ));

    let registry = ProviderRegistry::builder()
        .provider(spec("empty", TierKind::OpenAccess), empty)
        .provider(spec("zenodo", TierKind::Preprint), zenodo)
        .provider(
            spec("crossref", TierKind::MetadataOnly),
            Arc::new(MockSource::with_metadata("crossref", numpy_metadata())),
        )
        .build()
        .unwrap();
    let resolver = Resolver::new(registry, fast_config());

    let resolution = resolver.handle(NUMPY_DOI).await.unwrap();

    assert_eq!(resolution.trace.entries()[0].outcome, AttemptOutcome::NotFound);
    assert_eq!(resolution.paper.source(), Some("zenodo"));
    // The link came without a title, so the metadata tier filled it in
    assert_eq!(
        resolution.paper.metadata().and_then(|m| m.title.as_deref()),
        Some("Array programming with NumPy")
    );
    assert_eq!(resolution.paper.message(), "Paper found!");
}

#[tokio::test]
async fn same_tier_prefers_richer_metadata() {
    let sparse = Arc::new(MockSource::with_link(
        "doaj",
        "https://doaj.example.org/a.pdf",
        PaperMetadata::default().title(Some("Array programming with NumPy".to_string())),
    ));
    let rich = Arc::new(
        MockSource::with_link("europe_pmc", "https://europepmc.org/a.pdf", numpy_metadata())
            .delay(Duration::from_millis(30)),
    );

    let registry = ProviderRegistry::builder()
        .provider(spec("doaj", TierKind::OpenAccess), sparse)
        .provider(spec("europe_pmc", TierKind::OpenAccess), rich)
        .build()
        .unwrap();
    let config = OrchestratorConfig {
        grace_period: Duration::from_millis(500),
        ..fast_config()
    };
    let resolver = Resolver::new(registry, config);

    let resolution = resolver.handle(NUMPY_DOI).await.unwrap();

    assert_eq!(resolution.paper.source(), Some("europe_pmc"));
    assert_eq!(resolution.trace.len(), 2);
}

#[tokio::test]
async fn metadata_tier_links_are_never_selected() {
    let registry = ProviderRegistry::builder()
        .provider(spec("core", TierKind::OpenAccess), Arc::new(MockSource::not_found("core")))
        .provider(
            spec("crossref", TierKind::MetadataOnly),
            Arc::new(MockSource::with_link(
                "crossref",
                "https://api.crossref.org/a.pdf",
                numpy_metadata(),
            )),
        )
        .build()
        .unwrap();
    let resolver = Resolver::new(registry, fast_config());

    let resolution = resolver.handle(NUMPY_DOI).await.unwrap();

    assert!(!resolution.paper.has_link());
    assert_eq!(resolution.paper.message(), "no open-access copy found");
    assert_eq!(
        resolution.paper.metadata().and_then(|m| m.journal.as_deref()),
        Some("Nature")
    );
}

#[tokio::test]
async fn resolving_twice_is_idempotent() {
    let registry = ProviderRegistry::builder()
        .provider(spec("core", TierKind::OpenAccess), Arc::new(MockSource::not_found("core")))
        .provider(
            spec("arxiv", TierKind::Preprint),
            Arc::new(MockSource::with_link(
                "arxiv",
                "https://arxiv.org/pdf/2006.10256",
                PaperMetadata::default().year(Some(2020)),
            )),
        )
        .provider(
            spec("crossref", TierKind::MetadataOnly),
            Arc::new(MockSource::with_metadata("crossref", numpy_metadata())),
        )
        .build()
        .unwrap();
    let resolver = Resolver::new(registry, fast_config());

    let first = resolver.handle(NUMPY_DOI).await.unwrap();
    let second = resolver.handle(NUMPY_DOI).await.unwrap();

    assert_eq!(first.paper, second.paper);
    assert_eq!(first.outcome, second.outcome);
}

#[tokio::test]
async fn observer_sees_one_event_per_resolution() {
    let registry = ProviderRegistry::builder()
        .provider(
            spec("unpaywall", TierKind::OpenAccess),
            Arc::new(MockSource::with_link("unpaywall", "https://example.org/a.pdf", numpy_metadata())),
        )
        .build()
        .unwrap();
    let stats = Arc::new(StatsCollector::new());
    let resolver = Resolver::new(registry, fast_config()).with_observer(stats.clone());

    resolver.handle(NUMPY_DOI).await.unwrap();
    resolver.handle("10.1234/other").await.unwrap();
    let _ = resolver.handle("garbage").await;

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.processed, 2);
    assert_eq!(snapshot.with_link, 2);
}

#[test]
fn reconciler_keeps_the_orchestrator_winner() {
    let winner = paper_finder::models::ProviderResult::new(
        "arxiv",
        paper_finder::models::ProviderStatus::Found,
    )
    .with_link("https://arxiv.org/pdf/1");

    let paper = reconciler::merge(std::slice::from_ref(&winner), Some(&winner), false);
    assert_eq!(paper.source(), Some("arxiv"));
    assert_eq!(paper.message(), "Paper found, but no metadata available");
}

// ===== End to end through real adapters =====

fn config_for(server_url: &str, ids: &[&str]) -> Config {
    let mut config = Config::default();
    config.contact.email = Some("librarian@example.org".to_string());
    config.sources.enabled_sources = Some(ids.join(","));
    config.sources.disabled_sources = None;
    config.resolver.grace_period_ms = 100;
    config.providers = ids
        .iter()
        .map(|id| ProviderOverride {
            id: id.to_string(),
            base_url: Some(format!("{}/{}", server_url, id)),
            timeout_secs: Some(5),
            ..ProviderOverride::default()
        })
        .collect();
    config
}

#[tokio::test]
async fn end_to_end_unpaywall_link_with_crossref_enrichment() {
    let mut server = mockito::Server::new_async().await;
    let unpaywall = server
        .mock("GET", "/unpaywall/10.1234%2Fe2e")
        .match_query(mockito::Matcher::UrlEncoded(
            "email".into(),
            "librarian@example.org".into(),
        ))
        .with_status(200)
        .with_body(
            r#"{
                "doi": "10.1234/e2e",
                "title": null,
                "best_oa_location": {
                    "url_for_pdf": "https://repository.example.org/e2e.pdf",
                    "host_type": "repository"
                },
                "oa_locations": []
            }"#,
        )
        .create_async()
        .await;
    let crossref = server
        .mock("GET", "/crossref/works/10.1234%2Fe2e")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"message": {
                "title": ["End to end"],
                "container-title": ["Journal of Tests"],
                "published": {"date-parts": [[2022, 1, 5]]}
            }}"#,
        )
        .create_async()
        .await;

    let config = config_for(&server.url(), &["unpaywall", "crossref"]);
    let resolver = Resolver::from_config(&config).unwrap();

    let resolution = resolver.handle("doi:10.1234/e2e").await.unwrap();

    unpaywall.assert_async().await;
    crossref.assert_async().await;
    assert_eq!(
        resolution.paper.full_text_link(),
        Some("https://repository.example.org/e2e.pdf")
    );
    assert_eq!(resolution.paper.source(), Some("unpaywall"));
    let metadata = resolution.paper.metadata().unwrap();
    assert_eq!(metadata.title.as_deref(), Some("End to end"));
    assert_eq!(metadata.journal.as_deref(), Some("Journal of Tests"));
    assert_eq!(metadata.year, Some(2022));
}

#[tokio::test]
async fn end_to_end_http_errors_stay_in_the_trace() {
    let mut server = mockito::Server::new_async().await;
    let _unpaywall = server
        .mock("GET", "/unpaywall/10.1234%2Fflaky")
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let _crossref = server
        .mock("GET", "/crossref/works/10.1234%2Fflaky")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let config = config_for(&server.url(), &["unpaywall", "crossref"]);
    let resolver = Resolver::from_config(&config).unwrap();

    let resolution = resolver.handle("10.1234/flaky").await.unwrap();

    assert_eq!(resolution.outcome, ResolutionOutcome::NoCopyFound);
    assert_eq!(resolution.trace.count(AttemptOutcome::Error), 1);
    assert_eq!(resolution.trace.count(AttemptOutcome::NotFound), 1);
}

#[test]
fn unknown_provider_in_config_is_rejected() {
    let mut config = Config::default();
    config.sources.enabled_sources = Some("unpaywall,scihub".to_string());

    let err = Resolver::from_config(&config).unwrap_err();
    assert!(matches!(err, RegistryError::UnknownProvider(ref id) if id == "scihub"));
}
