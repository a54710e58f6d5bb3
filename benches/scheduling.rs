//! Criterion benchmarks for the task scheduler's hot paths.
//!
//! Covers:
//!   - Task submission (DAG insert + cycle check)
//!   - Candidate assignment under each `AssignmentStrategy`
//!   - Full submit -> assign -> start -> complete lifecycle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use usc::domain::models::agent::{Agent, AgentKind, Capabilities};
use usc::domain::models::task::{Task, TaskPriority};
use usc::services::{AssignmentStrategy, Scheduler, SchedulerConfig};

fn worker_agent(skill: &str) -> Agent {
    let mut caps = Capabilities::default();
    caps.skills.insert(skill.to_string(), 1.0);
    caps.limits.max_concurrent_tasks = 4;
    Agent::new("worker", AgentKind::Worker, caps)
}

fn bench_submit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("scheduler_submit_independent_task", |b| {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        b.to_async(&rt).iter(|| async {
            let task = Task::new("coding", "bench task", TaskPriority::Normal);
            black_box(scheduler.submit(task).await.unwrap())
        })
    });
}

fn bench_assign_next(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("scheduler_assign_next");

    for strategy in [
        AssignmentStrategy::RoundRobin,
        AssignmentStrategy::LeastLoaded,
        AssignmentStrategy::CapabilityMatch,
        AssignmentStrategy::PriorityBased,
    ] {
        group.bench_with_input(
            BenchmarkId::new("strategy", format!("{strategy:?}")),
            &strategy,
            |b, &strategy| {
                let scheduler = Scheduler::new(SchedulerConfig { strategy, ..Default::default() });
                let candidates: Vec<Agent> = (0..20).map(|_| worker_agent("coding")).collect();
                rt.block_on(async {
                    for _ in 0..50 {
                        scheduler
                            .submit(Task::new("coding", "seed", TaskPriority::Normal))
                            .await
                            .unwrap();
                    }
                });
                b.to_async(&rt).iter(|| async {
                    black_box(scheduler.assign_next(&candidates).await)
                });
            },
        );
    }

    group.finish();
}

fn bench_full_lifecycle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("scheduler_submit_start_complete", |b| {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        b.to_async(&rt).iter(|| async {
            let task_id = scheduler
                .submit(Task::new("coding", "lifecycle", TaskPriority::Normal))
                .await
                .unwrap();
            scheduler.start(task_id).await.unwrap();
            scheduler
                .complete(task_id, serde_json::json!({"ok": true}))
                .await
                .unwrap();
            black_box(task_id)
        })
    });
}

criterion_group!(benches, bench_submit, bench_assign_next, bench_full_lifecycle);
criterion_main!(benches);
