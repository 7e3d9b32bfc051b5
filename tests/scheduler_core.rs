// tests/scheduler_core.rs

use std::error::Error;

use rundag::FailurePolicy;
use rundag::dag::{ScheduledTask, Scheduler, TaskRunState};
use rundag::engine::{TaskEvent, TaskOutcome};
use rundag::errors::SchedulerError;

type TestResult = Result<(), Box<dyn Error>>;

fn core(limit: usize) -> Scheduler<()> {
    Scheduler::new(limit, FailurePolicy::Release).expect("valid limit")
}

fn blocking_core(limit: usize) -> Scheduler<()> {
    Scheduler::new(limit, FailurePolicy::Block).expect("valid limit")
}

fn deps(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn names(tasks: Vec<ScheduledTask<()>>) -> Vec<String> {
    tasks.into_iter().map(|t| t.id).collect()
}

/// The eight-task diamond: task1 -> {task2, task3} -> task4 -> task5 -> {task6, task7, task8}.
fn diamond(s: &mut Scheduler<()>) -> TestResult {
    s.register("task1".into(), (), 1, deps(&[]))?;
    s.register("task2".into(), (), 2, deps(&["task1"]))?;
    s.register("task3".into(), (), 1, deps(&["task1"]))?;
    s.register("task4".into(), (), 3, deps(&["task2", "task3"]))?;
    s.register("task5".into(), (), 2, deps(&["task4"]))?;
    s.register("task6".into(), (), 1, deps(&["task5"]))?;
    s.register("task7".into(), (), 3, deps(&["task5"]))?;
    s.register("task8".into(), (), 2, deps(&["task5"]))?;
    Ok(())
}

#[test]
fn zero_concurrency_is_rejected() {
    match Scheduler::<()>::new(0, FailurePolicy::Release) {
        Err(SchedulerError::ConfigError(msg)) => assert!(msg.contains("concurrency")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn task_without_dependencies_is_ready_within_registration() -> TestResult {
    let mut s = core(1);

    let state = s.register("A".into(), (), 1, deps(&[]))?;

    assert_eq!(state, TaskRunState::Ready);
    assert_eq!(s.state_of("A"), Some(TaskRunState::Ready));
    assert_eq!(s.ready_len(), 1);
    assert_eq!(s.pending_count("A"), Some(0));
    Ok(())
}

#[test]
fn priority_then_registration_order_with_single_slot() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 1, deps(&[]))?;
    s.register("B".into(), (), 3, deps(&[]))?;
    s.register("C".into(), (), 1, deps(&[]))?;

    let mut order = Vec::new();
    loop {
        let batch = names(s.dispatch_ready());
        assert!(batch.len() <= 1);
        let Some(id) = batch.into_iter().next() else {
            break;
        };
        s.complete(&id, TaskOutcome::Success);
        order.push(id);
    }

    assert_eq!(order, ["B", "A", "C"]);
    assert!(s.is_quiescent());
    Ok(())
}

#[test]
fn dependent_enters_ready_queue_only_after_dependency_settles() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 1, deps(&[]))?;
    s.register("B".into(), (), 2, deps(&["A"]))?;

    assert_eq!(s.state_of("B"), Some(TaskRunState::Blocked));
    assert_eq!(names(s.dispatch_ready()), ["A"]);
    assert_eq!(s.ready_len(), 0);
    assert_eq!(s.state_of("B"), Some(TaskRunState::Blocked));

    let step = s.complete("A", TaskOutcome::Success);
    assert_eq!(step.newly_ready, ["B"]);
    assert!(!step.quiescent);
    assert_eq!(s.state_of("B"), Some(TaskRunState::Ready));

    assert_eq!(names(s.dispatch_ready()), ["B"]);
    let step = s.complete("B", TaskOutcome::Success);
    assert!(step.quiescent);
    Ok(())
}

#[test]
fn diamond_respects_dependencies_priorities_and_limit() -> TestResult {
    let mut s = core(2);
    diamond(&mut s)?;

    assert_eq!(names(s.dispatch_ready()), ["task1"]);
    assert!(s.dispatch_ready().is_empty());

    let step = s.complete("task1", TaskOutcome::Success);
    assert_eq!(step.newly_ready, ["task2", "task3"]);
    assert_eq!(names(s.dispatch_ready()), ["task2", "task3"]);
    assert_eq!(s.running(), 2);

    assert!(s.complete("task2", TaskOutcome::Success).newly_ready.is_empty());
    assert!(s.dispatch_ready().is_empty());
    assert_eq!(s.complete("task3", TaskOutcome::Success).newly_ready, ["task4"]);
    assert_eq!(names(s.dispatch_ready()), ["task4"]);

    assert_eq!(s.complete("task4", TaskOutcome::Success).newly_ready, ["task5"]);
    assert_eq!(names(s.dispatch_ready()), ["task5"]);

    let step = s.complete("task5", TaskOutcome::Success);
    assert_eq!(step.newly_ready, ["task6", "task7", "task8"]);

    // Two slots: the two highest priorities go first.
    assert_eq!(names(s.dispatch_ready()), ["task7", "task8"]);
    assert_eq!(s.running(), 2);
    assert_eq!(s.ready_len(), 1);

    s.complete("task8", TaskOutcome::Success);
    assert_eq!(names(s.dispatch_ready()), ["task6"]);
    s.complete("task7", TaskOutcome::Success);
    s.complete("task6", TaskOutcome::Success);

    assert!(s.is_quiescent());
    assert!(s.check_stranded().is_ok());
    Ok(())
}

#[test]
fn running_never_exceeds_the_limit() -> TestResult {
    let mut s = core(3);
    for i in 0..10 {
        s.register(format!("t{i}"), (), 0, deps(&[]))?;
    }

    let first = names(s.dispatch_ready());
    assert_eq!(first, ["t0", "t1", "t2"]);
    assert_eq!(s.running(), 3);
    assert!(s.dispatch_ready().is_empty());

    s.complete("t1", TaskOutcome::Success);
    assert_eq!(s.running(), 2);
    assert_eq!(names(s.dispatch_ready()), ["t3"]);
    assert_eq!(s.running(), 3);
    Ok(())
}

#[test]
fn duplicate_id_is_rejected_and_leaves_graph_untouched() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 1, deps(&[]))?;

    match s.register("A".into(), (), 9, deps(&["ghost"])) {
        Err(SchedulerError::DuplicateTaskId(id)) => assert_eq!(id, "A"),
        other => panic!("expected DuplicateTaskId, got {other:?}"),
    }

    let info = s.lookup("A").expect("A registered");
    assert_eq!(info.priority, 1);
    assert!(info.deps.is_empty());
    assert!(s.graph().dependents_of("ghost").is_empty());
    assert_eq!(s.task_count(), 1);
    assert_eq!(s.ready_len(), 1);
    Ok(())
}

#[test]
fn forward_reference_resolves_once_dependency_registers_and_settles() -> TestResult {
    let mut s = core(2);
    s.register("late-user".into(), (), 0, deps(&["late"]))?;
    assert_eq!(s.state_of("late-user"), Some(TaskRunState::Blocked));
    assert_eq!(s.graph().dependents_of("late"), ["late-user"]);

    s.register("late".into(), (), 0, deps(&[]))?;
    assert_eq!(names(s.dispatch_ready()), ["late"]);

    let step = s.complete("late", TaskOutcome::Success);
    assert_eq!(step.newly_ready, ["late-user"]);
    Ok(())
}

#[test]
fn dependency_already_settled_counts_as_resolved() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.dispatch_ready();
    s.complete("A", TaskOutcome::Success);

    let state = s.register("B".into(), (), 0, deps(&["A"]))?;
    assert_eq!(state, TaskRunState::Ready);
    assert_eq!(s.pending_count("B"), Some(0));
    Ok(())
}

#[test]
fn duplicate_entries_in_dependency_list_count_once() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.register("B".into(), (), 0, deps(&["A", "A"]))?;

    assert_eq!(s.pending_count("B"), Some(1));
    assert_eq!(s.lookup("B").map(|i| i.deps.clone()), Some(deps(&["A"])));

    s.dispatch_ready();
    assert_eq!(s.complete("A", TaskOutcome::Success).newly_ready, ["B"]);
    Ok(())
}

#[test]
fn settlement_of_task_that_is_not_running_is_ignored() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.register("B".into(), (), 0, deps(&["A"]))?;

    // Not dispatched yet.
    let step = s.complete("A", TaskOutcome::Success);
    assert!(step.newly_ready.is_empty());
    assert_eq!(s.state_of("A"), Some(TaskRunState::Ready));

    // Unknown id.
    assert!(s.complete("nope", TaskOutcome::Success).newly_ready.is_empty());

    s.dispatch_ready();
    assert_eq!(s.complete("A", TaskOutcome::Success).newly_ready, ["B"]);
    // Settling twice must not decrement again or free a second slot.
    s.dispatch_ready();
    let step = s.complete("A", TaskOutcome::Success);
    assert!(step.newly_ready.is_empty());
    assert_eq!(s.running(), 1);
    Ok(())
}

#[test]
fn failure_releases_dependents_by_default() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.register("B".into(), (), 0, deps(&["A"]))?;

    s.dispatch_ready();
    let step = s.complete("A", TaskOutcome::Failed("exit 1".into()));

    assert_eq!(step.newly_ready, ["B"]);
    assert!(step.newly_skipped.is_empty());
    assert_eq!(s.state_of("A"), Some(TaskRunState::Failed));
    assert_eq!(names(s.dispatch_ready()), ["B"]);
    Ok(())
}

#[test]
fn block_policy_skips_transitive_dependents() -> TestResult {
    let mut s = blocking_core(2);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.register("B".into(), (), 0, deps(&["A"]))?;
    s.register("C".into(), (), 0, deps(&["B"]))?;
    s.register("D".into(), (), 0, deps(&[]))?;

    assert_eq!(names(s.dispatch_ready()), ["A", "D"]);
    let step = s.complete("A", TaskOutcome::Failed("boom".into()));

    assert!(step.newly_ready.is_empty());
    assert_eq!(step.newly_skipped, ["B", "C"]);
    assert_eq!(s.state_of("B"), Some(TaskRunState::Skipped));
    assert_eq!(s.state_of("C"), Some(TaskRunState::Skipped));

    // Independent work is unaffected.
    s.complete("D", TaskOutcome::Success);
    assert!(s.is_quiescent());
    assert!(s.check_stranded().is_ok());

    // Late registrations on a failed or skipped task are skipped immediately.
    assert_eq!(s.register("E".into(), (), 0, deps(&["A"]))?, TaskRunState::Skipped);
    assert_eq!(s.register("F".into(), (), 0, deps(&["C"]))?, TaskRunState::Skipped);
    assert!(s.dispatch_ready().is_empty());

    let skipped: Vec<&str> = s
        .timeline()
        .iter()
        .filter_map(|e| match e {
            TaskEvent::Skipped { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, ["B", "C", "E", "F"]);
    Ok(())
}

#[test]
fn block_policy_skips_forward_referencing_waiters_of_a_late_skip() -> TestResult {
    let mut s = blocking_core(1);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.dispatch_ready();
    s.complete("A", TaskOutcome::Failed("boom".into()));

    // Y waits on X before X exists; X is then skipped at registration.
    s.register("Y".into(), (), 0, deps(&["X"]))?;
    s.register("X".into(), (), 0, deps(&["A"]))?;

    assert_eq!(s.state_of("X"), Some(TaskRunState::Skipped));
    assert_eq!(s.state_of("Y"), Some(TaskRunState::Skipped));
    assert!(s.check_stranded().is_ok());
    Ok(())
}

#[test]
fn block_policy_success_still_releases() -> TestResult {
    let mut s = blocking_core(1);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.register("B".into(), (), 0, deps(&["A"]))?;
    s.dispatch_ready();

    assert_eq!(s.complete("A", TaskOutcome::Success).newly_ready, ["B"]);
    Ok(())
}

#[test]
fn unknown_dependency_is_reported_at_quiescence() -> TestResult {
    let mut s = core(2);
    s.register("X".into(), (), 0, deps(&["ghost"]))?;
    s.register("Y".into(), (), 0, deps(&["X"]))?;
    s.register("Z".into(), (), 0, deps(&[]))?;

    s.dispatch_ready();
    s.complete("Z", TaskOutcome::Success);
    assert!(s.is_quiescent());

    match s.check_stranded() {
        Err(SchedulerError::UnknownDependency {
            task,
            missing,
            stranded,
        }) => {
            assert_eq!(task, "X");
            assert_eq!(missing, ["ghost"]);
            assert_eq!(stranded, ["X", "Y"]);
        }
        other => panic!("expected UnknownDependency, got {other:?}"),
    }
    Ok(())
}

#[test]
fn cycle_is_reported_at_quiescence() -> TestResult {
    let mut s = core(1);
    s.register("P".into(), (), 0, deps(&["Q"]))?;
    s.register("Q".into(), (), 0, deps(&["P"]))?;
    s.register("R".into(), (), 0, deps(&["Q"]))?;

    assert!(s.is_quiescent());
    match s.check_stranded() {
        Err(SchedulerError::DependencyCycle(cycle)) => assert_eq!(cycle, ["P", "Q"]),
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
    Ok(())
}

#[test]
fn self_dependency_is_a_cycle() -> TestResult {
    let mut s = core(1);
    s.register("S".into(), (), 0, deps(&["S"]))?;

    match s.check_stranded() {
        Err(SchedulerError::DependencyCycle(cycle)) => assert_eq!(cycle, ["S"]),
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
    Ok(())
}

#[test]
fn timeline_interleaves_dispatch_and_settlement() -> TestResult {
    let mut s = core(1);
    s.register("A".into(), (), 5, deps(&[]))?;
    s.register("B".into(), (), 1, deps(&["A"]))?;

    s.dispatch_ready();
    s.complete("A", TaskOutcome::Success);
    s.dispatch_ready();
    s.complete("B", TaskOutcome::Failed("nope".into()));

    assert_eq!(
        s.timeline(),
        [
            TaskEvent::Dispatched {
                id: "A".into(),
                priority: 5
            },
            TaskEvent::Settled {
                id: "A".into(),
                outcome: TaskOutcome::Success
            },
            TaskEvent::Dispatched {
                id: "B".into(),
                priority: 1
            },
            TaskEvent::Settled {
                id: "B".into(),
                outcome: TaskOutcome::Failed("nope".into())
            },
        ]
    );
    Ok(())
}

#[test]
fn taking_the_timeline_starts_a_fresh_one() -> TestResult {
    let mut s = core(2);
    s.register("A".into(), (), 0, deps(&[]))?;
    s.dispatch_ready();
    s.complete("A", TaskOutcome::Success);

    let taken = s.take_timeline();
    assert_eq!(taken.len(), 2);
    assert!(s.timeline().is_empty());

    s.register("B".into(), (), 0, deps(&["A"]))?;
    assert_eq!(names(s.dispatch_ready()), ["B"]);
    assert_eq!(
        s.timeline(),
        [TaskEvent::Dispatched {
            id: "B".into(),
            priority: 0
        }]
    );
    Ok(())
}
