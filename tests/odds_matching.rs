use matchday_ledger::aliases::AliasTables;
use matchday_ledger::fuzzy::MatchThresholds;
use matchday_ledger::normalize::NameNormalizer;
use matchday_ledger::odds::{OddsRecord, OddsResolver, implied_probabilities};
use matchday_ledger::store::PredictionStore;

fn tables() -> AliasTables {
    AliasTables::bundled().expect("bundled tables")
}

#[test]
fn exact_keys_win_over_earlier_fuzzy_candidates() {
    let records = vec![
        OddsRecord::new("Arsenal", "Chelsey", "Premier League, England").with_match_odds(1.9, 3.6, 4.0),
        OddsRecord::new("Arsenal FC", "Chelsea", "Premier League, England")
            .with_match_odds(2.0, 3.5, 3.8),
    ];
    let r = OddsResolver::new(&tables(), MatchThresholds::default(), records);

    let hit = r
        .resolve_odds("Arsenal", "Chelsea FC", Some("Premier League, England"))
        .expect("match");
    assert_eq!(hit.team2, "Chelsea");
    assert_eq!(hit.home_odds, Some(2.0));
}

#[test]
fn exact_league_beats_earlier_sibling_competition() {
    let records = vec![
        OddsRecord::new("Liverpool", "Brighton", "Premier League 2, England").with_match_odds(1.5, 4.2, 5.5),
        OddsRecord::new("Liverpool", "Brighton", "Premier League, England").with_match_odds(1.7, 4.0, 4.6),
    ];
    let r = OddsResolver::new(&tables(), MatchThresholds::default(), records);

    for league in ["Premier League, England", "Premier League", "England - Premier League"] {
        let hit = r
            .resolve_odds("Liverpool", "Brighton", Some(league))
            .expect("match");
        assert_eq!(hit.league_name, "Premier League, England", "query league {league:?}");
        assert_eq!(hit.home_odds, Some(1.7));
    }

    let hit = r
        .resolve_odds("Liverpool", "Brighton", Some("Premier League 2, England"))
        .expect("match");
    assert_eq!(hit.home_odds, Some(1.5));
}

#[test]
fn compatible_league_still_matches_exact_teams() {
    let records = vec![OddsRecord::new("Liverpool", "Brighton", "Premier League 2, England")];
    let r = OddsResolver::new(&tables(), MatchThresholds::default(), records);
    let hit = r
        .resolve_odds("Liverpool", "Brighton", Some("Premier League, England"))
        .expect("compatible league");
    assert_eq!(hit.league_name, "Premier League 2, England");
}

#[test]
fn unknown_fixture_is_no_data() {
    let records = vec![OddsRecord::new("Malmo FF", "Hammarby", "Allsvenskan, Sweden")];
    let r = OddsResolver::new(&tables(), MatchThresholds::default(), records);
    assert!(r.resolve_odds("Lazio", "Torino", Some("Serie A, Italy")).is_none());
}

#[test]
fn resolver_loads_from_the_store() {
    let store = PredictionStore::open_in_memory().expect("store");
    store
        .insert_odds(&OddsRecord::new("Brøndby IF", "FC København", "Superliga, Denmark").with_match_odds(2.6, 3.4, 2.5))
        .expect("insert");
    store
        .insert_odds(&OddsRecord::new("Rosenborg", "Molde", "Eliteserien, Norway"))
        .expect("insert");

    let r = OddsResolver::load(&store, &tables(), MatchThresholds::default()).expect("load");
    assert_eq!(r.len(), 2);
    assert_eq!(
        r.leagues_with_odds(),
        vec!["Eliteserien, Norway", "Superliga, Denmark"]
    );

    let hit = r
        .resolve_odds("Brondby", "FC Kobenhavn", Some("Superliga, Denmark"))
        .expect("match");
    let p = implied_probabilities(hit).expect("probabilities");
    assert!(p.away > p.home);
}

#[test]
fn normalizers_are_independent_profiles() {
    let t = tables();
    let odds = NameNormalizer::odds_teams(&t);
    let market = NameNormalizer::market_teams(&t);
    assert_ne!(odds.label(), market.label());
    for raw in ["Bayern Munich", "Sporting CP", "Inter", "", "Al-Hilal"] {
        let once = odds.normalize(raw);
        assert_eq!(odds.normalize(&once), once);
        let once = market.normalize(raw);
        assert_eq!(market.normalize(&once), once);
    }
}
