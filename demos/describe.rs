use kafkactl::cluster::{ClusterApi, ClusterBuilder};

#[tokio::main]
async fn main() {
    let brokers = std::env::var("KAFKA_CONNECT")
        .unwrap_or_else(|_| "localhost:9092".to_string())
        .split(',')
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    let cluster = ClusterBuilder::new(brokers).build().await.unwrap();

    println!("cluster: {}", cluster.id().await.unwrap());
    println!("controller: {}", cluster.controller().await.unwrap().id);
    for broker in cluster.brokers().await.unwrap() {
        println!("broker {} rack={:?}", broker.id, broker.rack);
    }

    for topic in cluster.topics().await.unwrap() {
        println!("\n{topic}");
        for p in cluster.describe_topic(&topic).await.unwrap() {
            println!(
                "  {:>4} leader={:?} replicas={:?} isr={:?}",
                p.partition(),
                p.leader,
                p.replicas,
                p.isr
            );
        }
        for d in cluster.partition_distribution(&topic).await.unwrap() {
            println!(
                "  broker {:>4}: {} replicas, {} leaders",
                d.broker, d.replicas, d.leaders
            );
        }
    }
}
