//! Timer lifecycle through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use varactions::{
    notification_channel, Engine, InMemoryVariableStore, Notification, Received, Registry, ResourceError, Statement,
    StatementContext, StatementError, StatementRunner, ThreadTimerBackend, TimerBackend, TimerId, TimerManager,
    Timescale, Trigger, MAX_TIMERS,
};

#[derive(Debug, Default)]
struct Armed(Vec<(TimerId, Duration)>);

impl TimerBackend for Armed {
    fn arm(&mut self, id: TimerId, period: Duration) -> Result<(), ResourceError> {
        self.0.push((id, period));
        Ok(())
    }
}

#[test]
fn thousand_milliseconds_equals_one_second() {
    let mut timers = TimerManager::new(Armed::default());
    let ms = timers.create_repeating_timer(1000, Some(Timescale::Milliseconds)).unwrap();
    let s = timers.create_repeating_timer(1, Some(Timescale::Seconds)).unwrap();

    assert_ne!(ms, s);
    assert_eq!(timers.get(ms).unwrap().period, Duration::from_secs(1));
    assert_eq!(timers.get(ms).unwrap().period, timers.get(s).unwrap().period);
    let armed = &timers.backend().0;
    assert_eq!(armed[0].1, armed[1].1);
}

#[test]
fn zero_interval_registers_nothing() {
    let mut timers = TimerManager::new(Armed::default());
    let err = timers.create_repeating_timer(0, Some(Timescale::Seconds)).unwrap_err();
    assert!(err.is_resource());
    assert!(timers.is_empty());
    assert!(timers.backend().0.is_empty());
}

#[test]
fn table_full_after_max_timers() {
    let mut timers = TimerManager::new(Armed::default());
    let mut last = None;
    for _ in 0..MAX_TIMERS {
        last = Some(timers.create_repeating_timer(1, Some(Timescale::Hours)).unwrap());
    }
    assert_eq!(last.unwrap().get() as usize, MAX_TIMERS);

    // Full regardless of arguments, including ones that would be invalid anyway.
    for (count, unit) in [(1, Some(Timescale::Seconds)), (0, Some(Timescale::Seconds)), (5, None)] {
        let err = timers.create_repeating_timer(count, unit).unwrap_err();
        assert!(matches!(
            err,
            varactions::ActionsError::Resource(ResourceError::TimerTableFull { .. })
        ));
    }
    assert_eq!(timers.len(), MAX_TIMERS);
}

#[test]
fn scheduler_thread_raises_expiries() {
    let (notifier, notifications) = notification_channel();
    let mut timers = TimerManager::new(ThreadTimerBackend::start(notifier).unwrap());
    let fast = timers.create_repeating_timer(15, Some(Timescale::Milliseconds)).unwrap();
    let _slow = timers.create_repeating_timer(1, Some(Timescale::Hours)).unwrap();

    for _ in 0..3 {
        let got = notifications.wait_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got, Some(Received::Notification(Notification::timer(fast.get()))));
    }
}

struct Counting(Arc<AtomicUsize>);

impl StatementRunner for Counting {
    fn run(&self, _ctx: &mut StatementContext<'_>, _statement: &Statement) -> Result<(), StatementError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn engine_services_timer_expiries_until_shutdown() {
    let (notifier, notifications) = notification_channel();
    let store = Arc::new(InMemoryVariableStore::open(notifier.clone()));
    let mut timers = TimerManager::new(ThreadTimerBackend::start(notifier.clone()).unwrap());
    let timer = timers.create_repeating_timer(10, Some(Timescale::Milliseconds)).unwrap();

    let registry = Registry::builder()
        .trigger(Trigger::on_timer(timer).statements(vec![Statement::parse(1, "log tick").unwrap()]))
        .build();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut engine = Engine::new(registry, store, Box::new(Counting(runs.clone())));

    let worker = thread::spawn(move || engine.run(&notifications));

    let deadline = Instant::now() + Duration::from_secs(5);
    while runs.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    notifier.shutdown().unwrap();
    drop(timers);

    worker.join().unwrap().unwrap();
    assert!(runs.load(Ordering::SeqCst) >= 3);
}
