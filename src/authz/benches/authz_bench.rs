//! Authorization handler benchmarks
//!
//! Measures the broker hot path (scope check followed by resource check)
//! against the in-memory permission store.

use broker_authz::{
    seed, AuthManager, GroupResolver, InMemoryPermissionStore, InMemoryUserStore,
    PermissionStore, Principal, ResourceAction, ResourceAuthScope, ResourceType, User,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_manager(rt: &Runtime, queue_count: usize) -> AuthManager {
    rt.block_on(async {
        let store = Arc::new(InMemoryPermissionStore::new());
        seed::bootstrap(store.as_ref(), "admin", "admin").await.unwrap();

        let users = InMemoryUserStore::from_users(&[
            User {
                name: "alice".to_string(),
                groups: vec!["admin".to_string()],
            },
            User {
                name: "bob".to_string(),
                groups: vec!["guest".to_string()],
            },
        ]);

        let manager = AuthManager::with_parts(
            store.clone() as Arc<dyn PermissionStore>,
            Arc::new(users) as Arc<dyn GroupResolver>,
            "admin",
            true,
        );

        let alice = manager.authorization_handler(Principal::new("alice"));
        for i in 0..queue_count {
            let name = format!("queue-{}", i);
            alice
                .create_auth_resource(ResourceType::Queue, &name, true)
                .await
                .unwrap();
            store
                .add_resource_grant(
                    ResourceType::Queue,
                    &name,
                    ResourceAction::Consume,
                    &["admin".to_string()],
                )
                .await
                .unwrap();
        }

        manager
    })
}

fn bench_handle_allowed(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("handle_allowed");

    for queue_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("queues", queue_count),
            queue_count,
            |b, &count| {
                let manager = create_manager(&rt, count);
                let handler = manager.authorization_handler(Principal::new("alice"));

                b.to_async(&rt).iter(|| async {
                    let result = handler
                        .handle(
                            ResourceAuthScope::QueuesGet,
                            ResourceType::Queue,
                            black_box("queue-0"),
                            ResourceAction::Consume,
                        )
                        .await;
                    black_box(result.unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_scope_denial(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let manager = create_manager(&rt, 100);
    let handler = manager.authorization_handler(Principal::new("bob"));

    c.bench_function("scope_denial", |b| {
        b.to_async(&rt).iter(|| async {
            let result = handler
                .handle(
                    ResourceAuthScope::QueuesDelete,
                    ResourceType::Queue,
                    black_box("queue-0"),
                    ResourceAction::Delete,
                )
                .await;
            black_box(result.is_err());
        });
    });
}

fn bench_resource_lifecycle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let manager = create_manager(&rt, 0);
    let handler = manager.authorization_handler(Principal::new("alice"));

    c.bench_function("create_delete_resource", |b| {
        b.to_async(&rt).iter(|| async {
            handler
                .create_auth_resource(ResourceType::Queue, black_box("scratch"), false)
                .await
                .unwrap();
            handler
                .delete_auth_resource(ResourceType::Queue, black_box("scratch"))
                .await
                .unwrap();
        });
    });
}

fn bench_decision_metrics(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let manager = create_manager(&rt, 10);

    c.bench_function("metrics_export", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(manager.metrics().export_prometheus().await);
        });
    });
}

criterion_group!(
    benches,
    bench_handle_allowed,
    bench_scope_denial,
    bench_resource_lifecycle,
    bench_decision_metrics
);
criterion_main!(benches);
