use std::time::Duration;

use relay::{
    config::RoutingConfig,
    models::{ChannelEntry, MappingOrigin, ProviderKind, ProviderPriority},
    server::services::ChannelRouter,
};

fn routing(priority: Vec<ProviderKind>) -> RoutingConfig {
    RoutingConfig {
        priority: ProviderPriority::new(priority),
        numeric_min: 1,
        numeric_max: 850,
        fallback_delay: Duration::ZERO,
    }
}

static TEST_TABLE: &[ChannelEntry] = &[
    ChannelEntry {
        id: "espn",
        name: "ESPN",
        category: "sports",
        providers: &[
            (ProviderKind::Ppv, "espn-live"),
            (ProviderKind::EventBased, "espn"),
        ],
    },
    ChannelEntry {
        id: "7",
        name: "Seven",
        category: "tv",
        providers: &[
            (ProviderKind::NumericTv, "7"),
            (ProviderKind::EventBased, "seven"),
        ],
    },
    // no providers means the row doesn't exist
    ChannelEntry {
        id: "dead",
        name: "Dead",
        category: "tv",
        providers: &[],
    },
];

#[test]
fn test_unknown_ids_outside_numeric_range_are_not_found() {
    let router = ChannelRouter::default();

    for id in ["900", "0", "851", "abc", "", "-5", "+5", "5.0", "99999999999999999999"] {
        assert!(
            router.find_channel_by_id(id).is_none(),
            "{} should not resolve",
            id
        );
        assert!(router.get_optimal_provider(id).is_none());
        assert!(router.get_channel_providers(id).is_empty());
    }
}

#[test]
fn test_numeric_ids_in_range_are_synthesized() {
    let router = ChannelRouter::default();

    for n in [1, 51, 300, 850] {
        let id = n.to_string();
        let mapping = router.find_channel_by_id(&id).expect("in range");

        assert_eq!(mapping.origin, MappingOrigin::NumericId);
        assert_eq!(mapping.local_id(ProviderKind::NumericTv), Some(id.as_str()));
        assert_eq!(mapping.providers.len(), 1);

        let choice = router.get_optimal_provider(&id).expect("has a provider");
        assert_eq!(choice.provider, ProviderKind::NumericTv);
    }
}

#[test]
fn test_channel_51_synthesis() {
    let router = ChannelRouter::default();
    let mapping = router.find_channel_by_id("51").unwrap();

    assert_eq!(mapping.channel_id, "51");
    assert_eq!(mapping.info.name, "Channel 51");
    assert_eq!(mapping.info.category, "tv");
    assert_eq!(mapping.origin.as_str(), "numeric-id");
}

#[test]
fn test_optimal_provider_is_deterministic() {
    let router = ChannelRouter::with_table(routing(ProviderKind::DEFAULT_PRIORITY.to_vec()), TEST_TABLE);

    let first = router.get_optimal_provider("espn");
    for _ in 0..10 {
        assert_eq!(router.get_optimal_provider("espn"), first);
    }
    assert_eq!(first.map(|c| c.provider), Some(ProviderKind::EventBased));
    assert_eq!(first.map(|c| c.priority), Some(1));
}

#[test]
fn test_table_providers_follow_priority_order() {
    let router = ChannelRouter::with_table(
        routing(vec![ProviderKind::Ppv, ProviderKind::NumericTv]),
        TEST_TABLE,
    );

    assert_eq!(
        router.get_channel_providers("espn"),
        vec![ProviderKind::Ppv, ProviderKind::EventBased]
    );
    assert_eq!(
        router.get_channel_providers("7"),
        vec![ProviderKind::NumericTv, ProviderKind::EventBased]
    );
}

#[test]
fn test_table_wins_over_numeric_synthesis() {
    let router = ChannelRouter::with_table(routing(ProviderKind::DEFAULT_PRIORITY.to_vec()), TEST_TABLE);

    let mapping = router.find_channel_by_id("7").unwrap();
    assert_eq!(mapping.origin, MappingOrigin::StaticTable);
    assert_eq!(mapping.local_id(ProviderKind::EventBased), Some("seven"));
}

#[test]
fn test_lookup_ignores_case_and_whitespace() {
    let router = ChannelRouter::with_table(routing(ProviderKind::DEFAULT_PRIORITY.to_vec()), TEST_TABLE);

    assert!(router.find_channel_by_id("  ESPN ").is_some());
}

#[test]
fn test_rows_without_providers_are_not_found() {
    let router = ChannelRouter::with_table(routing(ProviderKind::DEFAULT_PRIORITY.to_vec()), TEST_TABLE);

    assert!(router.find_channel_by_id("dead").is_none());
}
