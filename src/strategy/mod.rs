//! Rack-aware replica placement.
//!
//! Every partition of a topic gets a contiguous window of the broker [`Ring`],
//! shifted by one ring position per partition index. The shift of partition 0
//! (the start offset) is drawn at random by default so that repeated runs do
//! not keep anchoring leadership on the same brokers.
//!
//! ```no_run
//! # async fn run() -> kafkactl::cluster::Result<()> {
//! use kafkactl::cluster::{ClusterApi, ClusterBuilder};
//! use kafkactl::strategy::{random::ThreadRandom, UniformDistStrategy};
//!
//! let cluster = ClusterBuilder::new(vec!["localhost:9092".to_owned()]).build().await?;
//! let plan = UniformDistStrategy::new(vec!["events".to_owned()])
//!     .assignments(&cluster, &mut ThreadRandom)
//!     .await?;
//! cluster
//!     .reassign_partitions(&cluster.partition_reassign_request(plan))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use tracing::{debug, info};

use crate::cluster::{ClusterApi, Error, Result};
use crate::topic::{PartitionReplicas, TopicPartitionInfo};

pub mod random;
pub mod ring;

use random::RandomIndex;
pub use ring::Ring;

/// Where the window of partition 0 starts on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartOffset {
    /// A random ring position.
    #[default]
    Random,

    /// The ring position of partition 0's current leader, falling back to a
    /// random position when that broker is gone or the partition is leaderless.
    CurrentLeader,

    /// A fixed ring position, taken modulo the ring length.
    Fixed(usize),
}

/// How often random start offsets are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetScope {
    /// Once for every topic.
    #[default]
    PerTopic,

    /// Once for the whole planning call, shared by all topics.
    PerCall,
}

/// Plans a uniform, rack-aware replica layout for a set of topics.
#[derive(Debug, Clone)]
pub struct UniformDistStrategy {
    topics: Vec<String>,
    start_offset: StartOffset,
    offset_scope: OffsetScope,
}

/// Builder for [`UniformDistStrategy`].
#[derive(Debug, Clone)]
pub struct UniformDistStrategyBuilder {
    inner: UniformDistStrategy,
}

impl UniformDistStrategyBuilder {
    pub fn start_offset(mut self, start_offset: StartOffset) -> Self {
        self.inner.start_offset = start_offset;
        self
    }

    pub fn offset_scope(mut self, offset_scope: OffsetScope) -> Self {
        self.inner.offset_scope = offset_scope;
        self
    }

    pub fn build(self) -> UniformDistStrategy {
        self.inner
    }
}

impl UniformDistStrategy {
    /// Strategy with a random start offset drawn per topic.
    pub fn new(topics: Vec<String>) -> Self {
        Self::builder(topics).build()
    }

    pub fn builder(mut topics: Vec<String>) -> UniformDistStrategyBuilder {
        topics.sort();
        topics.dedup();
        UniformDistStrategyBuilder {
            inner: Self {
                topics,
                start_offset: StartOffset::default(),
                offset_scope: OffsetScope::default(),
            },
        }
    }

    /// Topics to plan for, sorted and deduplicated.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Computes target replica lists for every partition of every topic.
    ///
    /// The result is sorted by (topic, partition). Any failure aborts the
    /// whole plan.
    pub async fn assignments<C, R>(
        &self,
        cluster: &C,
        rng: &mut R,
    ) -> Result<Vec<PartitionReplicas>>
    where
        C: ClusterApi + ?Sized,
        R: RandomIndex + Send,
    {
        if self.topics.is_empty() {
            return Err(Error::NoTopics);
        }

        let brokers = cluster.brokers().await.map_err(|e| match e {
            Error::BrokerQueryFailed(_) => e,
            e => Error::BrokerQueryFailed(Box::new(e)),
        })?;
        let ring = Ring::build(&brokers)?;
        debug!(ring = ?ring.as_slice(), "built broker ring");

        let shared = match self.offset_scope {
            OffsetScope::PerCall => Some(rng.random_index(ring.len())),
            OffsetScope::PerTopic => None,
        };

        let mut plan = vec![];
        for topic in &self.topics {
            let partitions = cluster.describe_topic(topic).await?;
            let start = self.start(&ring, &partitions, shared, rng);
            let assigned = assign_topic(&ring, topic, &partitions, start)?;
            debug!(topic = %topic, start, partitions = assigned.len(), "planned topic");
            plan.extend(assigned);
        }
        plan.sort();

        info!(
            topics = self.topics.len(),
            partitions = plan.len(),
            brokers = ring.len(),
            "computed reassignment plan",
        );
        Ok(plan)
    }

    fn start<R: RandomIndex>(
        &self,
        ring: &Ring,
        partitions: &[TopicPartitionInfo],
        shared: Option<usize>,
        rng: &mut R,
    ) -> usize {
        let mut random = || shared.unwrap_or_else(|| rng.random_index(ring.len()));
        match self.start_offset {
            StartOffset::Random => random(),
            StartOffset::Fixed(start) => start,
            StartOffset::CurrentLeader => partitions
                .iter()
                .find(|p| p.partition() == 0)
                .and_then(|p| p.leader)
                .and_then(|leader| ring.position(leader))
                .unwrap_or_else(random),
        }
    }
}

/// Assigns every partition of one topic a window of `ring`.
///
/// Partition `i` gets the `replication` brokers starting at ring position
/// `(start + i) mod N`. Each partition keeps its own replication factor.
pub fn assign_topic(
    ring: &Ring,
    topic: &str,
    partitions: &[TopicPartitionInfo],
    start: usize,
) -> Result<Vec<PartitionReplicas>> {
    if ring.is_empty() {
        return Err(Error::EmptyTopology);
    }
    let n = ring.len();
    let start = start % n;

    partitions
        .iter()
        .map(|p| {
            let partition = p.partition();
            let index = usize::try_from(partition).map_err(|_| {
                Error::InvalidResponse(format!("negative partition index {topic}/{partition}"))
            })?;

            match p.replication {
                0 => Err(Error::InvalidReplicationFactor {
                    topic: topic.to_string(),
                    partition,
                }),
                r if r > n => Err(Error::InsufficientBrokers {
                    topic: topic.to_string(),
                    partition,
                    replication: r,
                    brokers: n,
                }),
                r => Ok(PartitionReplicas::new(
                    topic,
                    partition,
                    ring.window((start + index % n) % n, r),
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;
    use crate::cluster::{Broker, SnapshotCluster};

    fn ring(ids: &[i32]) -> Ring {
        let brokers = ids.iter().map(|id| Broker::new(*id, "")).collect::<Vec<_>>();
        Ring::build(&brokers).unwrap()
    }

    fn uniform(topic: &str, count: i32, replication: usize) -> Vec<TopicPartitionInfo> {
        (0..count)
            .map(|i| {
                let mut info = TopicPartitionInfo::new(topic, i, vec![]);
                info.replication = replication;
                info
            })
            .collect()
    }

    fn fixed(index: usize) -> impl FnMut(usize) -> usize + Send {
        move |_| index
    }

    fn no_draw(_max: usize) -> usize {
        panic!("no random draw expected")
    }

    fn racked() -> SnapshotCluster {
        SnapshotCluster::new(vec![
            Broker::new(1, "1"),
            Broker::new(2, "1"),
            Broker::new(3, "2"),
        ])
    }

    #[test]
    fn windows_follow_the_ring() {
        for n in [2usize, 3, 5] {
            let ids = (1..=n as i32).collect::<Vec<_>>();
            let ring = ring(&ids);
            for r in 1..=n {
                for s in 0..n {
                    let plan = assign_topic(&ring, "t", &uniform("t", 7, r), s).unwrap();
                    for (i, p) in plan.iter().enumerate() {
                        let want = (0..r).map(|j| ids[(s + i + j) % n]).collect::<Vec<_>>();
                        assert_eq!(p.replicas, want, "n={n} r={r} s={s} i={i}");
                    }
                }
            }
        }
    }

    #[test]
    fn honors_per_partition_replication() {
        let mut partitions = uniform("t", 3, 2);
        partitions[1].replication = 3;

        let plan = assign_topic(&ring(&[1, 2, 3]), "t", &partitions, 0).unwrap();
        let lens = plan.iter().map(|p| p.replicas.len()).collect::<Vec<_>>();
        assert_eq!(lens, vec![2, 3, 2]);
    }

    #[test]
    fn rejects_impossible_replication() {
        let ring = ring(&[1, 2]);
        assert_matches!(
            assign_topic(&ring, "t", &uniform("t", 2, 3), 0),
            Err(Error::InsufficientBrokers {
                replication: 3,
                brokers: 2,
                ..
            })
        );
        assert_matches!(
            assign_topic(&ring, "t", &uniform("t", 2, 0), 0),
            Err(Error::InvalidReplicationFactor { partition: 0, .. })
        );
    }

    #[test]
    fn empty_topic_plans_nothing() {
        assert!(assign_topic(&ring(&[1]), "t", &[], 4).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn leadership_is_uniform(n in 1usize..12, count in 0i32..200, s in 0usize..50) {
            let ids = (0..n as i32).collect::<Vec<_>>();
            let plan = assign_topic(&ring(&ids), "t", &uniform("t", count, 1), s).unwrap();

            let mut leaders = vec![0usize; n];
            for p in &plan {
                leaders[p.leader().unwrap() as usize] += 1;
            }
            let floor = count as usize / n;
            let ceil = (count as usize + n - 1) / n;
            for l in leaders {
                prop_assert!(l == floor || l == ceil);
            }
        }

        #[test]
        fn planning_is_deterministic(n in 1usize..10, count in 0i32..50, s in 0usize..20) {
            let ids = (0..n as i32).collect::<Vec<_>>();
            let ring = ring(&ids);
            let partitions = uniform("t", count, n);
            let a = assign_topic(&ring, "t", &partitions, s).unwrap();
            let b = assign_topic(&ring, "t", &partitions, s).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn replicas_are_distinct(n in 1usize..10, r in 1usize..10, s in 0usize..20) {
            prop_assume!(r <= n);
            let ids = (0..n as i32).collect::<Vec<_>>();
            let plan = assign_topic(&ring(&ids), "t", &uniform("t", 10, r), s).unwrap();
            for p in plan {
                let mut replicas = p.replicas.clone();
                replicas.sort_unstable();
                replicas.dedup();
                prop_assert_eq!(replicas.len(), r);
            }
        }
    }

    #[tokio::test]
    async fn rack_aware_scenarios() {
        let cluster = racked()
            .with_topic("t", vec![vec![1, 2]; 3])
            .with_topic("u", vec![vec![1, 2, 3]; 3]);

        let plan = UniformDistStrategy::new(vec!["t".to_string()])
            .assignments(&cluster, &mut fixed(0))
            .await
            .unwrap();
        assert_eq!(
            plan,
            vec![
                PartitionReplicas::new("t", 0, vec![1, 3]),
                PartitionReplicas::new("t", 1, vec![3, 2]),
                PartitionReplicas::new("t", 2, vec![2, 1]),
            ]
        );

        let plan = UniformDistStrategy::new(vec!["u".to_string()])
            .assignments(&cluster, &mut fixed(0))
            .await
            .unwrap();
        assert_eq!(
            plan,
            vec![
                PartitionReplicas::new("u", 0, vec![1, 3, 2]),
                PartitionReplicas::new("u", 1, vec![3, 2, 1]),
                PartitionReplicas::new("u", 2, vec![2, 1, 3]),
            ]
        );
    }

    #[tokio::test]
    async fn anchors_at_current_leader() {
        let cluster = racked().with_topic("t", vec![vec![3, 1], vec![2, 3], vec![1, 2]]);

        let plan = UniformDistStrategy::builder(vec!["t".to_string()])
            .start_offset(StartOffset::CurrentLeader)
            .build()
            .assignments(&cluster, &mut no_draw)
            .await
            .unwrap();
        assert_eq!(
            plan,
            vec![
                PartitionReplicas::new("t", 0, vec![3, 2]),
                PartitionReplicas::new("t", 1, vec![2, 1]),
                PartitionReplicas::new("t", 2, vec![1, 3]),
            ]
        );
    }

    #[tokio::test]
    async fn offset_scope_controls_draws() {
        let cluster = racked()
            .with_topic("a", vec![vec![1, 3]; 2])
            .with_topic("b", vec![vec![1, 3]; 2]);

        for (scope, want) in [(OffsetScope::PerTopic, 2), (OffsetScope::PerCall, 1)] {
            let mut draws = 0;
            let mut rng = |max: usize| {
                draws += 1;
                max - 1
            };
            let plan = UniformDistStrategy::builder(vec!["b".to_string(), "a".to_string()])
                .offset_scope(scope)
                .build()
                .assignments(&cluster, &mut rng)
                .await
                .unwrap();
            assert_eq!(draws, want);
            assert_eq!(plan[0].replicas, vec![2, 1]);
            assert_eq!(plan[2].replicas, vec![2, 1]);
        }
    }

    #[tokio::test]
    async fn fixed_offset_wraps() {
        let cluster = racked().with_topic("t", vec![vec![1, 2]]);
        let plan = UniformDistStrategy::builder(vec!["t".to_string()])
            .start_offset(StartOffset::Fixed(4))
            .build()
            .assignments(&cluster, &mut no_draw)
            .await
            .unwrap();
        assert_eq!(plan, vec![PartitionReplicas::new("t", 0, vec![3, 2])]);
    }

    #[tokio::test]
    async fn failures_abort_the_plan() {
        let cluster = racked().with_topic("t", vec![vec![1, 2]]);

        let strategy = UniformDistStrategy::new(vec!["t".to_string(), "missing".to_string()]);
        assert_matches!(
            strategy.assignments(&cluster, &mut fixed(0)).await,
            Err(Error::TopicNotFound(t)) if t == "missing"
        );

        assert_matches!(
            UniformDistStrategy::new(vec![])
                .assignments(&cluster, &mut fixed(0))
                .await,
            Err(Error::NoTopics)
        );

        let empty = SnapshotCluster::new(vec![]).with_topic("t", vec![vec![1]]);
        assert_matches!(
            UniformDistStrategy::new(vec!["t".to_string()])
                .assignments(&empty, &mut fixed(0))
                .await,
            Err(Error::EmptyTopology)
        );
    }
}
