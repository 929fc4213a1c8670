use askama::Template;

use super::state::DashboardState;
use crate::analytics;

// ── Askama template + row view-models ────────────────────────────────

pub struct HourlyRow {
    pub hour: String,
    pub count: usize,
}

pub struct TopicRow {
    pub topic: String,
    pub count: u32,
    pub percent: String,
}

pub struct BucketRow {
    pub range: String,
    pub count: usize,
}

pub struct ScatterRow {
    pub length: usize,
    pub response_time: String,
    pub query: String,
}

pub struct RecentRow {
    pub time: String,
    pub query: String,
    pub response_time: String,
}

pub struct ConfigRow {
    pub key: String,
    pub value: String,
}

pub struct ServiceRow {
    pub name: String,
    pub detail: String,
    pub configured: bool,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub total_queries: u32,
    pub avg_response_time: String,
    pub success_rate: String,
    pub active_sessions: u32,
    pub hourly: Vec<HourlyRow>,
    pub topics: Vec<TopicRow>,
    pub buckets: Vec<BucketRow>,
    pub scatter: Vec<ScatterRow>,
    pub recent: Vec<RecentRow>,
    pub services: Vec<ServiceRow>,
    pub config: Vec<ConfigRow>,
}

/// Build the immutable view-model for the page from the dashboard state.
pub fn build_template(state: &DashboardState) -> DashboardTemplate {
    let data = &state.data;

    let hourly = analytics::hourly_counts(&data.queries)
        .into_iter()
        .map(|(hour, count)| HourlyRow {
            hour: format!("{hour:02}:00"),
            count,
        })
        .collect();

    let topics = analytics::topic_shares(&data.topics)
        .into_iter()
        .map(|s| TopicRow {
            topic: s.topic,
            count: s.count,
            percent: format!("{:.1}%", s.percent),
        })
        .collect();

    let buckets = analytics::response_time_histogram(&data.queries, 10)
        .into_iter()
        .map(|b| BucketRow {
            range: format!("{:.2}s - {:.2}s", b.lo, b.hi),
            count: b.count,
        })
        .collect();

    let scatter = analytics::length_vs_time(&data.queries)
        .iter()
        .zip(&data.queries)
        .map(|(&(length, response_time), q)| ScatterRow {
            length,
            response_time: format!("{response_time:.1}"),
            query: q.query.clone(),
        })
        .collect();

    let mut recent: Vec<RecentRow> = data
        .queries
        .iter()
        .map(|q| RecentRow {
            time: q.timestamp.format("%H:%M:%S").to_string(),
            query: q.query.clone(),
            response_time: format!("{:.1}", q.response_time),
        })
        .collect();
    recent.reverse();

    let display = &state.display;
    let service = |name: &str, detail: &str| ServiceRow {
        name: name.to_string(),
        detail: detail.to_string(),
        configured: detail != "Not configured",
    };
    let services = vec![
        service("Search Service", &display.search_endpoint),
        service("GPT Deployment", &display.gpt_deployment),
        service("Embedding Model", &display.embedding_deployment),
    ];

    let config = state
        .display
        .rows()
        .into_iter()
        .map(|(key, value)| ConfigRow {
            key: key.to_string(),
            value: value.to_string(),
        })
        .collect();

    DashboardTemplate {
        total_queries: data.metrics.total_queries,
        avg_response_time: format!("{:.1}s", data.metrics.avg_response_time),
        success_rate: format!("{:.1}%", data.metrics.success_rate),
        active_sessions: data.metrics.active_sessions,
        hourly,
        topics,
        buckets,
        scatter,
        recent,
        services,
        config,
    }
}

pub fn render_index(state: &DashboardState) -> axum::response::Html<String> {
    let template = build_template(state);
    axum::response::Html(template.render().unwrap_or_else(|e| {
        let msg = e
            .to_string()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!("<h1>Template error: {}</h1>", msg)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DashboardState {
        DashboardState::from_lookup(|_| None)
    }

    #[test]
    fn test_build_template_rows() {
        let template = build_template(&state());
        assert_eq!(template.total_queries, 127);
        assert_eq!(template.avg_response_time, "1.1s");
        assert_eq!(template.success_rate, "95.2%");
        assert_eq!(template.recent.len(), 5);
        assert_eq!(template.scatter.len(), 5);
        assert_eq!(template.topics.len(), 5);
        let hourly_total: usize = template.hourly.iter().map(|r| r.count).sum();
        assert_eq!(hourly_total, 5);
        assert_eq!(template.services.len(), 3);
        assert!(template.services.iter().all(|s| !s.configured));
    }

    #[test]
    fn test_services_reflect_configured_values() {
        let state = DashboardState::from_lookup(|key| {
            (key == "AZURE_SEARCH_ENDPOINT").then(|| "https://search.example.net".to_string())
        });
        let template = build_template(&state);
        assert!(template.services[0].configured);
        assert!(!template.services[1].configured);
    }

    #[test]
    fn test_recent_rows_newest_first() {
        let template = build_template(&state());
        // Sample data is oldest-first; the table shows newest first
        assert_eq!(template.recent[0].query, "Nocturnal ecosystems");
        assert_eq!(template.recent[4].query, "What is bioluminescence?");
    }

    #[test]
    fn test_render_produces_page() {
        let html = build_template(&state()).render().unwrap();
        assert!(html.contains("Earth at Night Analytics Dashboard"));
        assert!(html.contains("127"));
        assert!(html.contains("Urban Lighting"));
        assert!(html.contains("Not configured"));
    }
}
