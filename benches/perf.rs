use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchday_ledger::aliases::AliasTables;
use matchday_ledger::fuzzy::{MatchThresholds, best_match, similarity};
use matchday_ledger::normalize::NameNormalizer;
use matchday_ledger::odds::{OddsRecord, OddsResolver};
use matchday_ledger::results_fetch::parse_match_result_json;

const TEAM_NAMES: &[&str] = &[
    "IFK Norrköping",
    "Mjällby AIF",
    "AL Nassr FC",
    "Brøndby IF",
    "FC København",
    "Galatasaray (U19)",
    "Sporting CP",
    "Bayern Munich",
    "Vikingur Reykjavik",
    "Breidablik UBK",
];

fn sample_odds(n: usize) -> Vec<OddsRecord> {
    (0..n)
        .map(|i| {
            OddsRecord::new(
                &format!("Home Club {i}"),
                &format!("Away Club {i}"),
                if i % 2 == 0 {
                    "Allsvenskan, Sweden"
                } else {
                    "Superliga, Denmark"
                },
            )
            .with_match_odds(2.0, 3.2, 3.5)
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let tables = AliasTables::bundled().unwrap();
    let odds = NameNormalizer::odds_teams(&tables);
    let market = NameNormalizer::market_teams(&tables);
    c.bench_function("normalize_team_names", |b| {
        b.iter(|| {
            for name in TEAM_NAMES {
                black_box(odds.normalize(black_box(name)));
                black_box(market.normalize(black_box(name)));
            }
        })
    });
}

fn bench_similarity(c: &mut Criterion) {
    let candidates: Vec<(usize, String)> = (0..500).map(|i| (i, format!("club number {i}"))).collect();
    c.bench_function("best_match_500", |b| {
        b.iter(|| {
            let hit = best_match(
                black_box("club number 437"),
                candidates.iter().map(|(i, n)| (*i, n.as_str())),
                0.65,
            );
            black_box(hit);
        })
    });
    c.bench_function("similarity_pair", |b| {
        b.iter(|| black_box(similarity(black_box("vikingur reykjavik"), black_box("vikingur"))))
    });
}

fn bench_resolve_odds(c: &mut Criterion) {
    let tables = AliasTables::bundled().unwrap();
    let resolver = OddsResolver::new(&tables, MatchThresholds::default(), sample_odds(2_000));
    c.bench_function("resolve_odds_exact", |b| {
        b.iter(|| {
            black_box(resolver.resolve_odds(
                black_box("Home Club 1500"),
                black_box("Away Club 1500"),
                Some("Allsvenskan"),
            ))
        })
    });
    c.bench_function("resolve_odds_fuzzy_miss", |b| {
        b.iter(|| {
            black_box(resolver.resolve_odds(
                black_box("Hjome Clb 1501"),
                black_box("Awy Club 1501"),
                Some("Superliga"),
            ))
        })
    });
}

fn bench_match_result_parse(c: &mut Criterion) {
    c.bench_function("match_result_parse", |b| {
        b.iter(|| {
            let result = parse_match_result_json(black_box(MATCH_DETAILS_JSON)).unwrap();
            black_box(result);
        })
    });
}

criterion_group!(
    perf,
    bench_normalize,
    bench_similarity,
    bench_resolve_odds,
    bench_match_result_parse
);
criterion_main!(perf);

static MATCH_DETAILS_JSON: &str = include_str!("../tests/fixtures/fotmob_match_details.json");
