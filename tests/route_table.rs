//! Route table behaviour under updates and concurrent readers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use route_engine::routing::{ErrorKind, RequestAttributes, RouteTableManager};

fn hit(table: &RouteTableManager, path: &str) -> Option<String> {
    table
        .lookup(&RequestAttributes::for_path(path))
        .map(|r| r.id.clone())
}

/// A payload of `n` routes all tagged with `generation`.
fn generation_payload(generation: u32, n: usize) -> String {
    let routes: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"id":"r{i}","path":"/svc/{i}","target":"pool-{generation}","metadata":{{"generation":"{generation}"}}}}"#
            )
        })
        .collect();
    format!("[{}]", routes.join(","))
}

#[test]
fn test_priority_then_removal_scenario() {
    let table = RouteTableManager::new();
    table
        .apply(r#"[{"id":"a","path":"/x","target":"svc1","priority":1},{"id":"b","path":"/x","target":"svc2","priority":5}]"#)
        .unwrap();
    assert_eq!(hit(&table, "/x").as_deref(), Some("b"));

    table
        .apply(r#"[{"id":"a","path":"/x","target":"svc1","priority":1}]"#)
        .unwrap();
    assert_eq!(hit(&table, "/x").as_deref(), Some("a"));
}

#[test]
fn test_every_route_in_payload_is_reachable() {
    let table = RouteTableManager::new();
    table.apply(generation_payload(1, 10)).unwrap();
    for i in 0..10 {
        assert_eq!(
            hit(&table, &format!("/svc/{i}/items")),
            Some(format!("r{i}"))
        );
    }
    assert_eq!(hit(&table, "/other"), None);
}

#[test]
fn test_rejected_payloads_leave_lookups_identical() {
    let table = RouteTableManager::new();
    table.apply(generation_payload(1, 5)).unwrap();
    let before: Vec<_> = (0..5).map(|i| hit(&table, &format!("/svc/{i}"))).collect();

    let bad_payloads = [
        (r#"[{"id":"r0","path":"/a","target":"x"},{"id":"r0","path":"/b","target":"y"}]"#, ErrorKind::DuplicateRoute),
        (r#"[{"id":"r0","path":"/a","target":"gopher://x"}]"#, ErrorKind::InvalidTarget),
        (r#"[{"id":"r0","path":"/a","target":"x"}, 42]"#, ErrorKind::MalformedInput),
        ("", ErrorKind::MalformedInput),
    ];
    for (payload, kind) in bad_payloads {
        assert_eq!(table.apply(payload).unwrap_err().kind(), kind);
        let after: Vec<_> = (0..5).map(|i| hit(&table, &format!("/svc/{i}"))).collect();
        assert_eq!(before, after);
        assert_eq!(table.version(), 1);
    }
}

#[test]
fn test_readers_see_whole_snapshots_during_updates() {
    let table = Arc::new(RouteTableManager::new());
    table.apply(generation_payload(0, 20)).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    thread::scope(|scope| {
        for _ in 0..8 {
            let table = table.clone();
            let done = done.clone();
            scope.spawn(move || {
                let mut last_version = 0;
                while !done.load(Ordering::Acquire) {
                    let snapshot = table.snapshot().unwrap();
                    assert!(snapshot.version() >= last_version, "versions only move forward");
                    last_version = snapshot.version();

                    let generations: Vec<&str> = snapshot
                        .routes()
                        .iter()
                        .map(|r| r.metadata["generation"].as_str())
                        .collect();
                    assert_eq!(generations.len(), 20);
                    assert!(
                        generations.iter().all(|g| *g == generations[0]),
                        "mixed snapshot: {generations:?}"
                    );

                    let route = table.lookup(&RequestAttributes::for_path("/svc/3")).unwrap();
                    assert_eq!(route.id, "r3");
                }
            });
        }

        for generation in 1..=200 {
            table.apply(generation_payload(generation, 20)).unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(table.version(), 201);
    let route = table.lookup(&RequestAttributes::for_path("/svc/3")).unwrap();
    assert_eq!(route.target.as_str(), "pool-200");
}

#[test]
fn test_concurrent_writers_are_serialized() {
    let table = Arc::new(RouteTableManager::new());

    thread::scope(|scope| {
        for writer in 0..4u32 {
            let table = table.clone();
            scope.spawn(move || {
                for round in 0..25u32 {
                    table.apply(generation_payload(writer * 100 + round, 10)).unwrap();
                }
            });
        }
    });

    let snapshot = table.snapshot().unwrap();
    assert_eq!(snapshot.version(), 100);
    let first = &snapshot.routes()[0].metadata["generation"];
    assert!(snapshot
        .routes()
        .iter()
        .all(|r| &r.metadata["generation"] == first));
}

#[test]
fn test_pattern_route_does_not_capture_neighbouring_prefix() {
    let table = RouteTableManager::new();
    table
        .apply(r#"[{"id":"api","path":"/api/**","target":"svc"}]"#)
        .unwrap();
    assert_eq!(hit(&table, "/api/users").as_deref(), Some("api"));
    assert_eq!(hit(&table, "/api-internal/secrets"), None);
    assert_eq!(hit(&table, "/apiv2"), None);
}

#[test]
fn test_route_host_with_port_is_reachable() {
    let table = RouteTableManager::new();
    table
        .apply(r#"[{"id":"h","path":"/","host":"api.example.com:8080","target":"svc"}]"#)
        .unwrap();
    let req = RequestAttributes::for_path("/").with_host("api.example.com:8080");
    assert_eq!(table.lookup(&req).map(|r| r.id.clone()).as_deref(), Some("h"));
}

#[test]
fn test_tie_break_is_stable_across_runs() {
    let payload = r#"[{"id":"early","path":"/shop","target":"svc1","priority":3},
                      {"id":"late","path":"/shop","target":"svc2","priority":3},
                      {"id":"low","path":"/shop","target":"svc3","priority":1}]"#;
    for _ in 0..20 {
        let table = RouteTableManager::new();
        table.apply(payload).unwrap();
        assert_eq!(hit(&table, "/shop/cart").as_deref(), Some("early"));
    }
}
