//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 多生产者并发提交 (无丢失、无重复投递)
//! - 失败重新入队与恢复
//! - 配置驱动的投递目标

#[cfg(test)]
mod contract_tests {
    use contracts::{BatchingConfig, ConfigVersion, DeliveryType};

    #[test]
    fn test_contract_defaults() {
        assert_eq!(ConfigVersion::default(), ConfigVersion::V1);

        let batching = BatchingConfig::default();
        assert_eq!(batching.batch_size, 20);
        assert_eq!(batching.wait_interval_ms, 600);
        assert_eq!(batching.flush_interval_ms, 30_000);
        assert_eq!(batching.delivery_timeout_ms, 15_000);

        assert_eq!(DeliveryType::Http.required_params(), &["url"]);
        assert_eq!(DeliveryType::File.required_params(), &["path"]);
        assert!(DeliveryType::Log.required_params().is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;

    use buffer::QueueRegistry;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BatchingConfig, Record, SubmitStatus, TenantKey};
    use dispatcher::{create_delivery, BatchPipeline, FlushResult, MockDelivery};
    use serde_json::{json, Value};

    fn batching(batch_size: usize) -> BatchingConfig {
        BatchingConfig {
            batch_size,
            wait_interval_ms: 0,
            flush_interval_ms: 60_000,
            delivery_timeout_ms: 5_000,
        }
    }

    fn record(id: &str) -> Record {
        Record::with_external_id(json!({ "profile": id }), id)
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .filter_map(|r| r.external_id().map(str::to_string))
            .collect()
    }

    /// Concurrent producers: every accepted record is delivered exactly once
    ///
    /// 两个生产者提交同一 tenant 的相同 id，验证去重与并发 flush 不丢不重。
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_deliver_exactly_once() {
        let delivery = Arc::new(MockDelivery::new("mock"));
        let pipeline = BatchPipeline::new(&batching(7), Arc::clone(&delivery));

        let tenants = ["agency-1", "agency-2", "agency-3"];
        let mut producers = Vec::new();
        for producer in 0..4 {
            let pipeline = pipeline.clone();
            producers.push(tokio::spawn(async move {
                let mut accepted = Vec::new();
                for n in 0..50 {
                    let tenant_id = tenants[n % tenants.len()];
                    let tenant = TenantKey::new(tenant_id, format!("recruiter-{producer}"));
                    // Producers 0/1 and 2/3 share id spaces, so half the ids collide
                    let id = format!("{tenant_id}/p{}-{n}", producer / 2);
                    let outcome = pipeline.submit(tenant, record(&id)).await;
                    if outcome.is_accepted() {
                        accepted.push(id);
                    }
                }
                accepted
            }));
        }

        let mut accepted = Vec::new();
        for producer in producers {
            accepted.extend(producer.await.unwrap());
        }

        let reports = pipeline.drain(10).await;
        assert!(reports.iter().all(|r| r.is_success()));
        assert_eq!(pipeline.pending_count().await, 0);

        // 2 id spaces x 50 ids
        assert_eq!(accepted.len(), 100);

        let delivered: Vec<String> = delivery
            .delivered()
            .iter()
            .flat_map(|batch| ids(&batch.records))
            .collect();
        assert_eq!(delivered.len(), accepted.len());

        let delivered_set: HashSet<_> = delivered.iter().cloned().collect();
        let accepted_set: HashSet<_> = accepted.iter().cloned().collect();
        assert_eq!(delivered_set.len(), delivered.len(), "record delivered twice");
        assert_eq!(delivered_set, accepted_set);

        // No batch mixes tenants or exceeds the batch size
        for batch in delivery.delivered() {
            assert!(!batch.records.is_empty() && batch.records.len() <= 7);
            let prefix = format!("{}/", batch.tenant.tenant_id.as_str());
            assert!(ids(&batch.records).iter().all(|id| id.starts_with(&prefix)));
        }

        let metrics = pipeline.metrics();
        assert_eq!(metrics.accepted, 100);
        assert_eq!(metrics.duplicates, 100);
        assert_eq!(metrics.records_delivered, 100);
    }

    #[tokio::test]
    async fn test_dedup_across_flushes() {
        let delivery = Arc::new(MockDelivery::new("mock"));
        let pipeline = BatchPipeline::new(&batching(20), Arc::clone(&delivery));
        let alice = TenantKey::new("agency-1", "alice");
        let bob = TenantKey::new("agency-1", "bob");
        let other = TenantKey::new("agency-2", "alice");

        let first = pipeline.submit(alice.clone(), record("https://x/in/jane")).await;
        assert_eq!(first.status, SubmitStatus::Accepted);
        assert!(pipeline.flush().await.is_success());

        // Already delivered, same tenant
        let again = pipeline.submit(alice.clone(), record("https://x/in/jane")).await;
        assert!(again.is_duplicate());

        // Dedup is per tenant, not per actor
        let other_actor = pipeline.submit(bob, record("https://x/in/jane")).await;
        assert!(other_actor.is_duplicate());

        let other_tenant = pipeline.submit(other.clone(), record("https://x/in/jane")).await;
        assert!(other_tenant.is_accepted());

        // Records without an external id are never deduplicated
        for _ in 0..2 {
            let outcome = pipeline
                .submit(alice.clone(), Record::new(json!({"anonymous": true})))
                .await;
            assert!(outcome.is_accepted());
        }

        assert!(pipeline.flush().await.is_success());
        assert_eq!(delivery.delivered_records(&alice).len(), 3);
        assert_eq!(delivery.delivered_records(&other).len(), 1);
        assert_eq!(pipeline.registry().dedup_len().await, 2);
    }

    /// Requeued records go back ahead of newer arrivals
    #[tokio::test]
    async fn test_partial_failure_then_recovery() {
        let delivery = Arc::new(MockDelivery::new("mock"));
        let registry = Arc::new(QueueRegistry::new());
        let pipeline =
            BatchPipeline::with_registry(&batching(10), Arc::clone(&delivery), Arc::clone(&registry));

        let failing = TenantKey::new("agency-1", "alice");
        let healthy = TenantKey::new("agency-2", "bob");
        for n in 0..15 {
            registry.enqueue(failing.clone(), record(&format!("a{n}"))).await;
            registry.enqueue(healthy.clone(), record(&format!("b{n}"))).await;
        }
        delivery.fail_once(failing.clone(), 1);

        let report = pipeline.flush().await;
        assert_eq!(report.result(), FlushResult::PartialFailure);
        assert_eq!(report.failed_tenants(), vec![&failing]);
        assert_eq!(report.records_delivered(), 25);
        assert_eq!(report.records_requeued(), 5);

        // New arrival lands behind the requeued suffix
        registry.enqueue(failing.clone(), record("a15")).await;
        let expected: Vec<String> = (10..16).map(|n| format!("a{n}")).collect();
        assert_eq!(ids(&registry.tenant_records(&failing).await), expected);

        assert!(pipeline.flush().await.is_success());
        let all: Vec<String> = (0..16).map(|n| format!("a{n}")).collect();
        assert_eq!(ids(&delivery.delivered_records(&failing)), all);
        assert_eq!(delivery.delivered_records(&healthy).len(), 15);
        assert_eq!(pipeline.pending_count().await, 0);
    }

    /// A full outage keeps every record, in order, until the target recovers
    #[tokio::test]
    async fn test_order_preserved_through_outage() {
        let delivery = Arc::new(MockDelivery::new("mock"));
        let pipeline = BatchPipeline::new(&batching(10), Arc::clone(&delivery));
        let tenant = TenantKey::new("agency-1", "alice");

        delivery.set_failing(true);
        let mut failed_flushes = 0;
        for n in 0..25 {
            let outcome = pipeline.submit(tenant.clone(), record(&format!("r{n:02}"))).await;
            assert!(outcome.is_accepted());
            if outcome.flush_failed() {
                failed_flushes += 1;
            }
        }
        assert!(failed_flushes > 0);
        assert_eq!(pipeline.pending_count().await, 25);
        assert!(delivery.delivered().is_empty());

        delivery.set_failing(false);
        let reports = pipeline.drain(5).await;
        assert_eq!(reports.len(), 1);

        let batches = delivery.delivered();
        let sizes: Vec<usize> = batches.iter().map(|b| b.records.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        let expected: Vec<String> = (0..25).map(|n| format!("r{n:02}")).collect();
        assert_eq!(ids(&delivery.delivered_records(&tenant)), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_flush_delivers_below_threshold() {
        let delivery = Arc::new(MockDelivery::new("mock"));
        let config = BatchingConfig {
            flush_interval_ms: 1_000,
            ..batching(20)
        };
        let pipeline = BatchPipeline::new(&config, Arc::clone(&delivery));
        let handle = pipeline.start_interval();

        let tenant = TenantKey::new("agency-1", "alice");
        for n in 0..3 {
            pipeline.submit(tenant.clone(), record(&format!("r{n}"))).await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(delivery.delivered().is_empty());

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(delivery.delivered().len(), 1);
        assert_eq!(pipeline.pending_count().await, 0);

        handle.shutdown().await;
    }

    /// Config file -> FileDelivery -> NDJSON output
    #[tokio::test]
    async fn test_file_delivery_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("batches.ndjson");
        let toml = format!(
            r#"
[batching]
batch_size = 2
wait_interval_ms = 0

[delivery]
name = "archive"
delivery_type = "file"

[delivery.params]
path = '{}'
"#,
            path.display()
        );

        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let delivery =
            create_delivery(&config.delivery, config.batching.delivery_timeout()).unwrap();
        let pipeline = BatchPipeline::new(&config.batching, delivery);

        let tenant = TenantKey::new("agency-1", "alice");
        pipeline.submit(tenant.clone(), record("a")).await;
        let second = pipeline.submit(tenant.clone(), record("b")).await;
        assert!(second.flush.is_some_and(|report| report.is_success()));

        pipeline.submit(tenant, record("c")).await;
        assert_eq!(pipeline.drain(3).await.len(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["tenant_id"], "agency-1");
        assert_eq!(lines[0]["actor_id"], "alice");
        assert_eq!(
            lines[0]["records"],
            json!([{ "profile": "a" }, { "profile": "b" }])
        );
        assert_eq!(lines[1]["records"], json!([{ "profile": "c" }]));
    }

    #[tokio::test]
    async fn test_tenants_share_nothing_on_failure() {
        let delivery = Arc::new(MockDelivery::new("mock"));
        let registry = Arc::new(QueueRegistry::new());
        let pipeline =
            BatchPipeline::with_registry(&batching(5), Arc::clone(&delivery), Arc::clone(&registry));

        let tenants: Vec<TenantKey> = (0..4)
            .map(|n| TenantKey::new(format!("agency-{n}"), "ops"))
            .collect();
        for tenant in &tenants {
            for n in 0..3 {
                registry
                    .enqueue(tenant.clone(), record(&format!("{tenant}-{n}")))
                    .await;
            }
        }
        delivery.fail_once(tenants[2].clone(), 0);

        let report = pipeline.flush().await;
        assert_eq!(report.failed_tenants(), vec![&tenants[2]]);

        let pending: HashMap<&TenantKey, usize> = {
            let mut map = HashMap::new();
            for tenant in &tenants {
                map.insert(tenant, registry.tenant_len(tenant).await);
            }
            map
        };
        assert_eq!(pending[&tenants[2]], 3);
        assert_eq!(pending.values().sum::<usize>(), 3);
    }
}
