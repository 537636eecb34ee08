use kafkactl::cluster::{ClusterApi, ClusterBuilder};
use kafkactl::strategy::random::ThreadRandom;
use kafkactl::strategy::UniformDistStrategy;

#[tokio::main]
async fn main() {
    let mut execute = false;
    let mut topics = vec![];
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--execute" => execute = true,
            _ => topics.push(arg),
        }
    }

    let brokers = std::env::var("KAFKA_CONNECT")
        .unwrap_or_else(|_| "localhost:9092".to_string())
        .split(',')
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    let cluster = ClusterBuilder::new(brokers).build().await.unwrap();

    let plan = UniformDistStrategy::new(topics)
        .assignments(&cluster, &mut ThreadRandom)
        .await
        .unwrap();

    for p in &plan {
        let current = cluster
            .describe_topic(&p.topic)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.partition() == p.partition)
            .map(|c| c.replicas)
            .unwrap_or_default();
        println!(
            "{}/{}: {:?} -> {:?}",
            p.topic, p.partition, current, p.replicas
        );
    }

    if execute {
        let request = cluster.partition_reassign_request(plan);
        cluster.reassign_partitions(&request).await.unwrap();
        println!("reassignment of {} partitions accepted", request.partitions().len());
    }
}
