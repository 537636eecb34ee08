use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kafkactl::cluster::{Broker, SnapshotCluster};
use kafkactl::strategy::random::SeededRandom;
use kafkactl::strategy::{assign_topic, Ring, UniformDistStrategy};
use kafkactl::topic::TopicPartitionInfo;

fn brokers(n: i32) -> Vec<Broker> {
    (0..n).map(|id| Broker::new(id, format!("rack-{}", id % 3))).collect()
}

fn partitions(count: i32) -> Vec<TopicPartitionInfo> {
    (0..count)
        .map(|i| TopicPartitionInfo::new("t", i, vec![0, 1, 2]))
        .collect()
}

fn ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    for n in [3, 30, 300] {
        let brokers = brokers(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &brokers, |b, brokers| {
            b.iter(|| Ring::build(brokers).unwrap())
        });
    }
    group.finish();
}

fn assign(c: &mut Criterion) {
    let ring = Ring::build(&brokers(30)).unwrap();

    let mut group = c.benchmark_group("assign_topic");
    for count in [10, 1_000, 10_000] {
        let partitions = partitions(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &partitions,
            |b, partitions| b.iter(|| assign_topic(&ring, "t", partitions, 7).unwrap()),
        );
    }
    group.finish();
}

fn plan(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let topics = (0..20).map(|i| format!("topic-{i}")).collect::<Vec<_>>();
    let cluster = topics.iter().fold(SnapshotCluster::new(brokers(30)), |cluster, t| {
        cluster.with_topic(t.as_str(), vec![vec![0, 1, 2]; 100])
    });
    let strategy = UniformDistStrategy::new(topics);

    c.bench_function("plan_20_topics", |b| {
        b.to_async(&runtime).iter(|| async {
            strategy
                .assignments(&cluster, &mut SeededRandom::new(1))
                .await
                .unwrap()
        })
    });
}

criterion_group!(benches, ring, assign, plan);
criterion_main!(benches);
