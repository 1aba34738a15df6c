//! # Integration Tests
//!
//! Cross-crate flows: config -> producers -> BatchBus -> Dispatcher -> transport.

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Batch, DeviceInformation, Event, Operation, TrackerConfig};

    /// Field names on the wire are what a collector reads back
    #[test]
    fn test_batch_wire_shape() {
        let batch = Batch::new(
            Some(DeviceInformation {
                model: "Pixel 8".into(),
                ..Default::default()
            }),
            chrono::Utc::now(),
            7,
            "session-1",
            vec![Event::new("open")],
            vec![Operation::new(2, "purchase")],
        );

        let value = serde_json::to_value(&batch).unwrap();
        for key in [
            "device_information",
            "timestamp",
            "number",
            "correlation_id",
            "events",
            "operations",
            "retries",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["number"], 7);
        assert_eq!(value["retries"], 0);
        assert_eq!(value["correlation_id"], "session-1");
        assert_eq!(value["device_information"]["model"], "Pixel 8");

        let back: Batch = serde_json::from_value(value).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn test_tracker_config_defaults() {
        let config: TrackerConfig = ConfigLoader::load_from_str(
            r#"
[tracker]
app_id = "demo"
endpoint = "https://collector.example"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert!(config.dispatch.interval_ms > 0);
        assert!(config.dispatch.max_retries >= 1);
        assert!(config.device.is_none());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;

    use batch_bus::{BatchBus, CollectingReporter, DeviceInformation, Event, Operation};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Batch, TrackerConfig};
    use dispatcher::{create_transport, DispatchPolicy, Dispatcher, FlakyTransport, TickOutcome};
    use tokio::sync::watch;

    fn load_config(path: &std::path::Path, interval_ms: u64, max_retries: u32) -> TrackerConfig {
        let content = format!(
            r#"
[tracker]
app_id = "e2e"
endpoint = "https://collector.example"

[dispatch]
interval_ms = {interval_ms}
max_retries = {max_retries}
force_start_timer = true

[transport]
kind = "file"
path = "{}"

[device]
os_name = "android"
os_version = "14"
model = "Pixel 8"
"#,
            path.display()
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    fn read_batches(path: &std::path::Path) -> Vec<Batch> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Concurrent producers -> BatchBus -> Dispatcher -> FileTransport
    ///
    /// Every event arrives exactly once, per-session order is kept and no
    /// sequence number is delivered twice.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_producers_to_file() {
        const SESSION: &str = "session-e2e";
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("batches.jsonl");
        let config = load_config(&out, 5, 10);

        let bus = Arc::new(
            BatchBus::builder()
                .device_information(config.device.clone().unwrap())
                .build(),
        );
        let transport = create_transport("file", &config.transport).unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Dispatcher::new(
            Arc::clone(&bus),
            transport,
            DispatchPolicy::from(&config.dispatch),
        )
        .spawn(shutdown_rx);

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let bus = Arc::clone(&bus);
                tokio::spawn(async move {
                    for n in 0..25 {
                        let events = vec![Event::new(format!("{p}:{n}"))];
                        bus.add(bus.generate_batch(SESSION, Some(events), None));
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while bus.queued_len() > 0 || bus.pending_batch().is_some() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("bus did not drain");

        shutdown_tx.send(true).unwrap();
        let report = handle.await.unwrap();
        assert!(!report.gave_up);
        assert_eq!(report.summary.records_delivered, 100);

        let batches = read_batches(&out);
        assert_eq!(batches.len() as u64, report.metrics.sent_count);
        let numbers: HashSet<u64> = batches.iter().map(|b| b.number()).collect();
        assert_eq!(numbers.len(), batches.len());
        assert!(batches
            .iter()
            .all(|b| b.device_information().map(|d| d.model.as_str()) == Some("Pixel 8")));
        assert!(batches.iter().all(|b| b.correlation_id() == SESSION));

        let mut per_producer: HashMap<String, Vec<u32>> = HashMap::new();
        for event in batches.iter().flat_map(|b| b.events()) {
            let (p, n) = event.name.split_once(':').unwrap();
            per_producer
                .entry(p.to_string())
                .or_default()
                .push(n.parse().unwrap());
        }
        assert_eq!(per_producer.len(), 4);
        for sequence in per_producer.values() {
            assert_eq!(*sequence, (0..25).collect::<Vec<u32>>());
        }
    }

    /// A failed batch is resent unchanged (same number) with its retry count
    #[tokio::test]
    async fn test_e2e_retry_keeps_batch_identity() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("batches.jsonl");
        let config = load_config(&out, 5, 3);

        let bus = Arc::new(BatchBus::new());
        bus.add(bus.generate_batch("s", Some(vec![Event::new("a")]), None));
        bus.add(bus.generate_batch(
            "s",
            Some(vec![Event::new("b")]),
            Some(vec![Operation::new(3, "purchase")]),
        ));

        let always_fail = FlakyTransport::new(
            create_transport("file", &config.transport).unwrap(),
            1.0,
            0,
        );
        let mut failing = Dispatcher::new(
            Arc::clone(&bus),
            always_fail,
            DispatchPolicy::from(&config.dispatch),
        );
        let TickOutcome::Failed { number, retries } = failing.tick().await else {
            panic!("expected failure");
        };
        assert_eq!(retries, 1);
        assert_eq!(bus.pending_batch().unwrap().number(), number);

        // new work arrives while the merged batch is in flight
        bus.add(bus.generate_batch("s", Some(vec![Event::new("c")]), None));

        let mut healthy = Dispatcher::new(
            Arc::clone(&bus),
            create_transport("file", &config.transport).unwrap(),
            DispatchPolicy::from(&config.dispatch),
        );
        assert!(matches!(
            healthy.tick().await,
            TickOutcome::Sent { records: 3, .. }
        ));
        assert!(matches!(
            healthy.tick().await,
            TickOutcome::Sent { records: 1, .. }
        ));
        assert_eq!(healthy.tick().await, TickOutcome::Idle);
        drop(healthy);

        let batches = read_batches(&out);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].number(), number);
        assert_eq!(batches[0].retries(), 1);
        assert_eq!(batches[0].operations()[0].name, "purchase");
        assert_eq!(batches[1].events()[0].name, "c");
        assert!(batches[1].number() > batches[0].number());
        assert_eq!(bus.retries(), 0);
    }

    /// Persistent failures end in give-up; the bus is left empty
    #[tokio::test]
    async fn test_e2e_give_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("batches.jsonl"), 2, 2);

        let bus = Arc::new(BatchBus::new());
        for n in 0..3 {
            bus.add(bus.generate_batch("s", Some(vec![Event::new(format!("e{n}"))]), None));
        }

        let transport = FlakyTransport::new(
            create_transport("file", &config.transport).unwrap(),
            1.0,
            7,
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            Dispatcher::new(
                Arc::clone(&bus),
                transport,
                DispatchPolicy::from(&config.dispatch),
            )
            .run(shutdown_rx),
        )
        .await
        .unwrap();

        assert!(report.gave_up);
        assert_eq!(report.metrics.failure_count, 2);
        assert_eq!(report.metrics.sent_count, 0);
        assert!(bus.pending_batch().is_none());
        assert_eq!(bus.queued_len(), 0);
        assert_eq!(bus.retries(), 0);

        // work queued after the give-up goes out on the next healthy tick
        bus.add(bus.generate_batch("s", Some(vec![Event::new("fresh")]), None));
        let mut healthy = Dispatcher::new(
            Arc::clone(&bus),
            create_transport("file", &config.transport).unwrap(),
            DispatchPolicy::from(&config.dispatch),
        );
        assert!(matches!(
            healthy.tick().await,
            TickOutcome::Sent { records: 1, .. }
        ));
        drop(healthy);

        let batches = read_batches(&dir.path().join("batches.jsonl"));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].events()[0].name, "fresh");
    }

    /// Anomalies reach the injected reporter; device info is first-write-wins
    #[test]
    fn test_reporter_and_device_information() {
        let reporter = Arc::new(CollectingReporter::new());
        let bus = BatchBus::builder().reporter(reporter.clone()).build();

        let first = DeviceInformation {
            model: "first".into(),
            ..Default::default()
        };
        let second = DeviceInformation {
            model: "second".into(),
            ..Default::default()
        };
        assert!(bus.set_device_information(first));
        assert!(!bus.set_device_information(second));

        let empty = bus.generate_batch("s", None, None);
        assert!(empty.is_empty());
        assert_eq!(empty.device_information().unwrap().model, "first");

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].fatal);

        assert!(bus.pre_dispatch().is_err());
        assert!(bus.pending_batch().is_none());
    }
}
