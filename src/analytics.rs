//! Aggregations for the analytics dashboard.
//!
//! Pure transforms over a fixed sample dataset: deterministic output for a
//! given input, no external calls, no mutation.

use chrono::{DateTime, Duration, Local, Timelike};

/// One recorded question with its timing.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub query: String,
    pub timestamp: DateTime<Local>,
    pub response_time: f64,
}

/// Raw per-topic question count.
#[derive(Debug, Clone)]
pub struct TopicCount {
    pub topic: String,
    pub count: u32,
}

/// Headline metrics shown as dashboard cards.
#[derive(Debug, Clone, Copy)]
pub struct SummaryMetrics {
    pub total_queries: u32,
    pub avg_response_time: f64,
    pub success_rate: f64,
    pub active_sessions: u32,
}

/// The full sample dataset the dashboard renders.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub queries: Vec<QueryRecord>,
    pub topics: Vec<TopicCount>,
    pub metrics: SummaryMetrics,
}

/// Fixed demonstration dataset. Timestamps are relative to the current time
/// so the activity chart always shows recent hours.
pub fn sample_data() -> SampleData {
    let now = Local::now();
    let record = |query: &str, ago: Duration, response_time: f64| QueryRecord {
        query: query.to_string(),
        timestamp: now - ago,
        response_time,
    };

    let queries = vec![
        record("What is bioluminescence?", Duration::hours(2), 1.2),
        record("Urban heat island effect", Duration::hours(1), 0.8),
        record("Disaster monitoring satellite", Duration::minutes(30), 1.5),
        record("City lights from space", Duration::minutes(15), 0.9),
        record("Nocturnal ecosystems", Duration::minutes(5), 1.1),
    ];

    let topic = |name: &str, count: u32| TopicCount {
        topic: name.to_string(),
        count,
    };
    let topics = vec![
        topic("Urban Lighting", 35),
        topic("Nocturnal Ecosystems", 25),
        topic("Disaster Monitoring", 20),
        topic("Climate Science", 15),
        topic("Space Observations", 5),
    ];

    let metrics = SummaryMetrics {
        total_queries: 127,
        avg_response_time: 1.1,
        success_rate: 95.2,
        active_sessions: 8,
    };

    SampleData {
        queries,
        topics,
        metrics,
    }
}

/// Group queries by hour-of-day and count. Only hours with at least one
/// query appear, sorted ascending; the bucket counts always sum back to the
/// input length.
pub fn hourly_counts(queries: &[QueryRecord]) -> Vec<(u32, usize)> {
    let mut counts: Vec<(u32, usize)> = Vec::new();
    for q in queries {
        let hour = q.timestamp.hour();
        match counts.iter_mut().find(|(h, _)| *h == hour) {
            Some((_, n)) => *n += 1,
            None => counts.push((hour, 1)),
        }
    }
    counts.sort_by_key(|(h, _)| *h);
    counts
}

/// A topic's raw count with its share of the total.
#[derive(Debug, Clone)]
pub struct TopicShare {
    pub topic: String,
    pub count: u32,
    pub percent: f64,
}

/// Raw counts plus percentages. Percentages sum to 100 within float
/// tolerance; an empty input yields an empty output.
pub fn topic_shares(topics: &[TopicCount]) -> Vec<TopicShare> {
    let total: u32 = topics.iter().map(|t| t.count).sum();
    if total == 0 {
        return Vec::new();
    }
    topics
        .iter()
        .map(|t| TopicShare {
            topic: t.topic.clone(),
            count: t.count,
            percent: (t.count as f64 / total as f64) * 100.0,
        })
        .collect()
}

/// One fixed-width response-time bucket: `[lo, hi)`, last bucket inclusive.
#[derive(Debug, Clone, Copy)]
pub struct HistogramBucket {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Distribute response times into `bins` fixed-width buckets over the
/// observed range. A flat dataset (all values equal) collapses to a single
/// bucket holding everything.
pub fn response_time_histogram(queries: &[QueryRecord], bins: usize) -> Vec<HistogramBucket> {
    if queries.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for q in queries {
        lo = lo.min(q.response_time);
        hi = hi.max(q.response_time);
    }

    if hi <= lo {
        return vec![HistogramBucket {
            lo,
            hi,
            count: queries.len(),
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut buckets: Vec<HistogramBucket> = (0..bins)
        .map(|i| HistogramBucket {
            lo: lo + width * i as f64,
            hi: lo + width * (i + 1) as f64,
            count: 0,
        })
        .collect();

    for q in queries {
        let idx = (((q.response_time - lo) / width) as usize).min(bins - 1);
        buckets[idx].count += 1;
    }
    buckets
}

/// (query length in characters, response time) pairs for the scatter view.
pub fn length_vs_time(queries: &[QueryRecord]) -> Vec<(usize, f64)> {
    queries
        .iter()
        .map(|q| (q.query.chars().count(), q.response_time))
        .collect()
}
