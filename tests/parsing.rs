use std::fs;
use std::path::PathBuf;

use matchday_ledger::market_value::is_youth_team;
use matchday_ledger::results_fetch::parse_match_result_json;
use matchday_ledger::transfermarkt::{parse_search_json, parse_squad_json};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_finished_match_details() {
    let raw = read_fixture("fotmob_match_details.json");
    let result = parse_match_result_json(&raw)
        .expect("fixture should parse")
        .expect("known match");
    assert_eq!(result.scores(), Some((2, 1)));
    assert_eq!(result.status.as_deref(), Some("Completed"));
}

#[test]
fn cancelled_match_carries_no_score() {
    let raw = read_fixture("fotmob_match_cancelled.json");
    let result = parse_match_result_json(&raw)
        .expect("fixture should parse")
        .expect("known match");
    assert_eq!(result.scores(), None);
    assert_eq!(result.status.as_deref(), Some("Cancelled"));
}

#[test]
fn parses_transfermarkt_search_fixture() {
    let raw = read_fixture("transfermarkt_search.json");
    let clubs = parse_search_json(&raw).expect("fixture should parse");
    assert_eq!(clubs.len(), 3);
    assert_eq!(clubs[0].id, 383);
    let senior: Vec<_> = clubs.iter().filter(|c| !is_youth_team(&c.name)).collect();
    assert_eq!(senior.len(), 2);
}

#[test]
fn parses_transfermarkt_squad_fixture() {
    let raw = read_fixture("transfermarkt_squad.json");
    let squad = parse_squad_json(&raw).expect("fixture should parse");
    assert_eq!(squad.len(), 3);
    let total: u64 = squad.iter().filter_map(|p| p.market_value).sum();
    assert_eq!(total, 31_000_000);
}
