//! Unit tests for the registry, the stale scan and the report
//!
//! These tests run on the host (not embedded target) to verify
//! the core algorithms work correctly.

mod common;

#[cfg(test)]
mod registry_tests {
    use deadlock_guard::{LockId, Registration, Registry, TaskId};

    const T1: TaskId = TaskId(1);
    const T2: TaskId = TaskId(2);

    #[test]
    fn test_register_in_creation_order() {
        let mut registry: Registry<4> = Registry::new();

        assert_eq!(registry.register(LockId(10), Some("a")), Registration::Tracked { slot: 0 });
        assert_eq!(registry.register(LockId(11), Some("b")), Registration::Tracked { slot: 1 });
        assert_eq!(registry.register(LockId(12), None), Registration::Tracked { slot: 2 });

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.find(LockId(11)), Some(1));
        assert_eq!(registry.find(LockId(99)), None);

        let names: Vec<_> = registry.iter().map(|rec| rec.name).collect();
        assert_eq!(names, vec![Some("a"), Some("b"), None]);
    }

    #[test]
    fn test_register_same_lock_twice() {
        let mut registry: Registry<4> = Registry::new();

        registry.register(LockId(1), Some("a"));
        assert_eq!(registry.register(LockId(1), Some("a")), Registration::Tracked { slot: 0 });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_capacity_overflow_is_untracked() {
        let mut registry: Registry<2> = Registry::new();

        assert!(registry.register(LockId(1), None).is_tracked());
        assert!(registry.register(LockId(2), None).is_tracked());
        assert!(registry.is_full());

        assert_eq!(registry.register(LockId(3), None), Registration::Untracked);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.capacity(), 2);
        assert_eq!(registry.find(LockId(3)), None);

        // Bookkeeping on the untracked lock is a silent no-op
        assert!(!registry.mark_acquired(LockId(3), T1, 5));
        assert!(!registry.mark_released(LockId(3), T1));
        assert_eq!(registry.held().count(), 0);
    }

    #[test]
    fn test_acquire_release_bookkeeping() {
        let mut registry: Registry<4> = Registry::new();
        registry.register(LockId(1), Some("m"));

        assert!(registry.mark_acquired(LockId(1), T1, 100));
        let rec = registry.get(0).unwrap();
        assert_eq!(rec.holder, Some(T1));
        assert_eq!(rec.acquired_at, 100);

        assert!(registry.mark_released(LockId(1), T1));
        let rec = registry.get(0).unwrap();
        assert_eq!(rec.holder, None);
        assert_eq!(rec.acquired_at, 0);
    }

    #[test]
    fn test_release_twice_is_idempotent() {
        let mut registry: Registry<4> = Registry::new();
        registry.register(LockId(1), Some("m"));
        registry.mark_acquired(LockId(1), T1, 7);

        assert!(registry.mark_released(LockId(1), T1));
        let after_first = *registry.get(0).unwrap();

        assert!(!registry.mark_released(LockId(1), T1));
        assert_eq!(*registry.get(0).unwrap(), after_first);
    }

    #[test]
    fn test_late_release_does_not_clear_new_holder() {
        let mut registry: Registry<4> = Registry::new();
        registry.register(LockId(1), Some("m"));

        // T1 released on the primitive, T2 got the mutex and booked it
        // before T1's bookkeeping ran.
        registry.mark_acquired(LockId(1), T1, 10);
        registry.mark_acquired(LockId(1), T2, 20);

        assert!(!registry.mark_released(LockId(1), T1));
        let rec = registry.get(0).unwrap();
        assert_eq!(rec.holder, Some(T2));
        assert_eq!(rec.acquired_at, 20);
    }

    #[test]
    fn test_held_by_task() {
        let mut registry: Registry<4> = Registry::new();
        for id in 1..=3 {
            registry.register(LockId(id), None);
        }
        registry.mark_acquired(LockId(1), T1, 0);
        registry.mark_acquired(LockId(2), T2, 0);
        registry.mark_acquired(LockId(3), T1, 0);

        let t1_locks: Vec<_> = registry.held_by(T1).map(|rec| rec.lock).collect();
        assert_eq!(t1_locks, vec![LockId(1), LockId(3)]);
        assert_eq!(registry.held().count(), 3);
    }

    #[test]
    fn test_held_for_wraps_with_tick_counter() {
        let mut registry: Registry<1> = Registry::new();
        registry.register(LockId(1), None);
        registry.mark_acquired(LockId(1), T1, u32::MAX - 5);

        let rec = registry.get(0).unwrap();
        assert_eq!(rec.held_for(10), Some(16));
    }
}

#[cfg(test)]
mod scan_tests {
    use deadlock_guard::{first_stale, LockId, Registry, TaskId};

    const T1: TaskId = TaskId(1);
    const T2: TaskId = TaskId(2);

    fn registry_with(locks: u32) -> Registry<8> {
        let mut registry = Registry::new();
        for id in 1..=locks {
            registry.register(LockId(id), None);
        }
        registry
    }

    #[test]
    fn test_no_held_locks() {
        let registry = registry_with(3);
        assert_eq!(first_stale(&registry, 1_000_000, 10), None);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut registry = registry_with(1);
        registry.mark_acquired(LockId(1), T1, 1000);

        assert_eq!(first_stale(&registry, 6000, 5000), None);

        let stale = first_stale(&registry, 6001, 5000).unwrap();
        assert_eq!(stale.lock, LockId(1));
        assert_eq!(stale.holder, T1);
        assert_eq!(stale.held, 5001);
    }

    #[test]
    fn test_first_offender_wins() {
        let mut registry = registry_with(3);
        // Slot 2 is the worst offender, slot 1 is scanned first.
        registry.mark_acquired(LockId(2), T1, 500);
        registry.mark_acquired(LockId(3), T2, 0);

        let stale = first_stale(&registry, 2000, 1000).unwrap();
        assert_eq!(stale.slot, 1);
        assert_eq!(stale.lock, LockId(2));
    }

    #[test]
    fn test_free_locks_ignored() {
        let mut registry = registry_with(2);
        registry.mark_acquired(LockId(1), T1, 0);
        registry.mark_released(LockId(1), T1);

        assert_eq!(first_stale(&registry, u32::MAX, 1), None);
    }

    #[test]
    fn test_stale_across_tick_wrap() {
        let mut registry = registry_with(1);
        registry.mark_acquired(LockId(1), T1, u32::MAX - 100);

        assert_eq!(first_stale(&registry, 50, 200), None);
        assert!(first_stale(&registry, 150, 200).is_some());
    }
}

#[cfg(test)]
mod report_tests {
    use deadlock_guard::{first_stale, ImplicatedTasks, LockId, Registry, Report};

    use super::common::{ManualKernel, MONITOR, STRANGER, TASK1, TASK2};

    fn deadlocked_registry() -> Registry<8> {
        let mut registry = Registry::new();
        registry.register(LockId(1), Some("Mutex1"));
        registry.register(LockId(2), Some("Mutex2"));
        registry.register(LockId(3), Some("Mutex3"));
        registry.register(LockId(4), Some("Idle"));
        registry.mark_acquired(LockId(1), TASK1, 0);
        registry.mark_acquired(LockId(2), TASK2, 100);
        registry.mark_acquired(LockId(3), TASK1, 200);
        registry
    }

    fn render(kernel: &ManualKernel, registry: &Registry<8>, now: u32, with_trigger: bool) -> String {
        let report = Report {
            kernel,
            registry,
            now,
            invoker: MONITOR,
            trigger: if with_trigger {
                first_stale(registry, now, 5000)
            } else {
                None
            },
            threshold: 5000,
        };
        report.to_string()
    }

    #[test]
    fn test_implicated_tasks_are_distinct() {
        let registry = deadlocked_registry();
        let tasks: Vec<_> = ImplicatedTasks::collect(&registry).iter().collect();
        assert_eq!(tasks, vec![TASK1, TASK2]);
    }

    #[test]
    fn test_every_held_lock_listed_once() {
        let kernel = ManualKernel::new();
        let registry = deadlocked_registry();
        let out = render(&kernel, &registry, 6000, false);

        assert!(out.contains("triggered by task DeadlockDet"));
        assert_eq!(out.matches("  Mutex1 held by task Task1 (6000 ms)").count(), 1);
        assert_eq!(out.matches("  Mutex2 held by task Task2 (5900 ms)").count(), 1);
        assert_eq!(out.matches("  Mutex3 held by task Task1 (5800 ms)").count(), 1);
        assert!(!out.contains("Idle"));
        assert!(!out.contains("Deadlock detection:"));
    }

    #[test]
    fn test_implicated_task_sections() {
        let kernel = ManualKernel::new();
        let registry = deadlocked_registry();
        let out = render(&kernel, &registry, 6000, false);

        let (_, per_task) = out.split_once("Mutexes held by implicated tasks:\n").unwrap();
        assert_eq!(
            per_task,
            "Task Task1 holds:\n\
             \x20 - Mutex1 (held 6000 ms)\n\
             \x20 - Mutex3 (held 5800 ms)\n\
             Task Task2 holds:\n\
             \x20 - Mutex2 (held 5900 ms)\n"
        );
    }

    #[test]
    fn test_trigger_section() {
        let kernel = ManualKernel::new();
        let registry = deadlocked_registry();
        let out = render(&kernel, &registry, 6000, true);

        let first_line = out.lines().next().unwrap();
        assert_eq!(
            first_line,
            "Deadlock detection: mutex Mutex1 held by task Task1 for 6000 ms (limit 5000 ms), detected by task DeadlockDet"
        );
        // Offender's holdings, then once more in the per-task section
        assert_eq!(out.matches("Task Task1 holds:").count(), 2);
    }

    #[test]
    fn test_hold_time_in_milliseconds() {
        let kernel = ManualKernel::new().with_tick_rate(100);
        let mut registry: Registry<8> = Registry::new();
        registry.register(LockId(1), Some("slow"));
        registry.mark_acquired(LockId(1), TASK2, 0);

        let out = render(&kernel, &registry, 50, false);
        assert!(out.contains("slow held by task Task2 (500 ms)"));
    }

    #[test]
    fn test_unnamed_lock_and_unknown_task() {
        let kernel = ManualKernel::new();
        let mut registry: Registry<8> = Registry::new();
        registry.register(LockId(1), None);
        registry.mark_acquired(LockId(1), STRANGER, 0);

        let out = render(&kernel, &registry, 10, false);
        assert!(out.contains("<unnamed> held by task <unknown> (10 ms)"));
        assert!(out.contains("Task <unknown> holds:"));
    }
}

#[cfg(test)]
mod config_tests {
    use deadlock_guard::config::*;
    use deadlock_guard::OsError;

    #[test]
    fn test_config_values() {
        assert!(CFG_DEADLOCK_TIMEOUT > CFG_MONITOR_PERIOD, "Timeout shorter than a poll");
        assert!(CFG_MAX_MUTEX_TRACKING >= 1);
        assert!(CFG_TICK_RATE_HZ >= 10, "Tick rate too slow");
        assert!(CFG_MONITOR_STK_SIZE >= CFG_STK_SIZE_MIN, "Stack too small");

        // Monitor sits just above idle
        assert_eq!(CFG_PRIO_IDLE, (CFG_PRIO_MAX - 1) as u8);
        assert_eq!(CFG_MONITOR_PRIO, CFG_PRIO_IDLE - 1);
    }

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.stale_timeout, 5000);
        assert_eq!(config.poll_interval, 1000);
        assert_eq!(config, DetectorConfig::new());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_config_builder() {
        let config = DetectorConfig::new()
            .enabled(false)
            .stale_timeout(200)
            .poll_interval(20)
            .monitor_prio(3)
            .monitor_stk_size(512);

        assert!(!config.enabled);
        assert_eq!(config.stale_timeout, 200);
        assert_eq!(config.poll_interval, 20);
        assert_eq!(config.monitor_prio, 3);
        assert_eq!(config.monitor_stk_size, 512);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(DetectorConfig::new().poll_interval(0).validate(), Err(OsError::OptInvalid));
        assert_eq!(
            DetectorConfig::new().monitor_stk_size(CFG_STK_SIZE_MIN - 1).validate(),
            Err(OsError::OptInvalid)
        );
        assert_eq!(
            DetectorConfig::new().monitor_prio(CFG_PRIO_MAX as u8).validate(),
            Err(OsError::OptInvalid)
        );
    }
}

#[cfg(test)]
mod error_tests {
    use deadlock_guard::error::OsError;

    #[test]
    fn test_error_codes() {
        assert_eq!(OsError::Timeout.code(), 29401);
        assert_eq!(OsError::MutexNotOwner.code(), 22401);
        assert_ne!(OsError::Timeout, OsError::PendAbort);
        assert_eq!(OsError::PendWouldBlock.code(), 25008);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(OsError::Timeout.to_string(), "timed out (29401)");
        let _ = format!("{:?}", OsError::MonitorRunning);
    }
}
