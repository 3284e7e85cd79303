//! Hot-path benchmarks: pattern matching, the decide fold, and full
//! authorize calls over an in-memory directory.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use warden_authz::{decide, pattern_matches, AuthzEngine, EngineConfig, InMemoryDirectory};
use warden_core::{AttachmentLevel, Effect, Organization, Policy, Statement, Team, User};

fn bench_pattern_matching(c: &mut Criterion) {
    c.bench_function("pattern_literal", |b| {
        b.iter(|| pattern_matches(black_box("docs:read"), black_box("docs:read")))
    });

    c.bench_function("pattern_trailing_glob", |b| {
        b.iter(|| pattern_matches(black_box("org:42:reports:*"), black_box("org:42:reports:q3:summary")))
    });

    c.bench_function("pattern_interior_wildcard", |b| {
        b.iter(|| pattern_matches(black_box("org:*:reports"), black_box("org:42:reports")))
    });
}

fn bench_decide(c: &mut Criterion) {
    let effects: Vec<Effect> = (0..64)
        .map(|i| if i == 63 { Effect::Deny } else { Effect::Allow })
        .collect();

    c.bench_function("decide_64_statements", |b| {
        b.iter(|| decide(black_box(effects.iter().copied())))
    });
}

async fn fixture() -> InMemoryDirectory {
    let dir = InMemoryDirectory::new();
    dir.insert_organization(Organization::new("org1", "Org One"))
        .await;

    let root = Team::root("root", "org1", "Root");
    let mut parent = root.clone();
    dir.insert_team(root).await;
    // four levels of nesting
    for depth in 0..4 {
        let team = Team::child_of(&parent, format!("team-{}", depth), "Team");
        dir.insert_team(team.clone()).await;
        parent = team;
    }

    dir.insert_user(User::new("u1", "org1", "Alice")).await;
    dir.add_member("u1", "team-3").await;

    for i in 0..16 {
        let id = format!("p{}", i);
        dir.insert_policy(Policy::new(
            &id,
            "org1",
            &id,
            vec![Statement::allow(
                vec![format!("service{}:*", i)],
                vec!["*".to_string()],
            )],
        ))
        .await;
        dir.attach_policy(AttachmentLevel::Organization("org1".to_string()), &id)
            .await;
    }

    dir
}

fn bench_authorize(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = rt.block_on(fixture());

    let cached = AuthzEngine::with_defaults(Arc::new(dir.clone()));
    c.bench_function("authorize_cached", |b| {
        b.to_async(&rt).iter(|| async {
            cached
                .authorize("u1", "org1", "service7:read", "resource:1")
                .await
                .unwrap()
        })
    });

    let uncached = AuthzEngine::new(
        EngineConfig {
            enable_cache: false,
            ..Default::default()
        },
        Arc::new(dir),
    );
    c.bench_function("authorize_uncached", |b| {
        b.to_async(&rt).iter(|| async {
            uncached
                .authorize("u1", "org1", "service7:read", "resource:1")
                .await
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_pattern_matching, bench_decide, bench_authorize);
criterion_main!(benches);
