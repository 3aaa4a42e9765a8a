use criterion::{black_box, criterion_group, criterion_main, Criterion};

use learnkeep_core::adaptive::DifficultyController;
use learnkeep_core::model::{LearnerProfile, LearningPlan, Objective, SessionRecord};
use learnkeep_core::progress::recompute_progress;
use learnkeep_core::scoring::score;

fn make_session(correct: i64, duration_ms: i64) -> SessionRecord {
    SessionRecord {
        rounds_total: 10,
        rounds_completed: 10,
        attempts: 12,
        correct_total: correct,
        correct_first_attempt: correct.min(10),
        duration_ms,
        ..SessionRecord::new(Some("bench"), "memory")
    }
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let session = make_session(9, 45_000);
    let empty: Vec<SessionRecord> = Vec::new();

    group.bench_function("no_history", |b| {
        b.iter(|| score(black_box(&session), black_box(empty.as_slice())))
    });

    let history: Vec<SessionRecord> = (0..50).map(|i| make_session(8, 30_000 + i * 500)).collect();
    group.bench_function("history_50", |b| {
        b.iter(|| score(black_box(&session), black_box(&history)))
    });

    group.finish();
}

fn bench_adapt(c: &mut Criterion) {
    let controller = DifficultyController::default();
    let recent = vec![make_session(11, 40_000), make_session(12, 38_000), make_session(10, 41_000)];

    c.bench_function("evaluate", |b| {
        b.iter(|| {
            let mut learner = LearnerProfile::new("bench");
            learner.assign_game("memory");
            controller.evaluate(Some(&mut learner), black_box("memory"), 2, black_box(&recent))
        })
    });
}

fn bench_recompute(c: &mut Criterion) {
    let mut plan = LearningPlan::new("bench", "bench plan");
    for i in 0..5 {
        let mut o = Objective::new(format!("objective {i}"), 50, 5);
        o.id = format!("o{i}");
        plan.objectives.push(o);
    }
    let sessions: Vec<SessionRecord> = (0..1_000)
        .map(|i| SessionRecord {
            plan_id: Some(plan.id.clone()),
            objective_id: Some(format!("o{}", i % 5)),
            ..make_session(7, 30_000)
        })
        .collect();
    let plans = vec![plan];

    c.bench_function("recompute_1000_sessions", |b| {
        b.iter(|| recompute_progress(black_box(&plans), black_box(&sessions)))
    });
}

criterion_group!(benches, bench_score, bench_adapt, bench_recompute);
criterion_main!(benches);
