use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;

use super::state::DashboardState;
use super::templates;
use crate::analytics;

// ── GET / — full dashboard page ──────────────────────────────────────

pub async fn index(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    templates::render_index(&state)
}

// ── GET /api/metrics — headline metrics as JSON ──────────────────────

#[derive(Serialize)]
pub struct MetricsResponse {
    pub total_queries: u32,
    pub avg_response_time: f64,
    pub success_rate: f64,
    pub active_sessions: u32,
}

pub async fn get_metrics(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let m = state.data.metrics;
    Json(MetricsResponse {
        total_queries: m.total_queries,
        avg_response_time: m.avg_response_time,
        success_rate: m.success_rate,
        active_sessions: m.active_sessions,
    })
}

// ── GET /api/activity — per-hour query counts ────────────────────────

#[derive(Serialize)]
pub struct ActivityBucket {
    pub hour: u32,
    pub count: usize,
}

pub async fn get_activity(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let buckets: Vec<ActivityBucket> = analytics::hourly_counts(&state.data.queries)
        .into_iter()
        .map(|(hour, count)| ActivityBucket { hour, count })
        .collect();
    Json(buckets)
}

// ── GET /api/topics — topic distribution with shares ─────────────────

#[derive(Serialize)]
pub struct TopicResponse {
    pub topic: String,
    pub count: u32,
    pub percent: f64,
}

pub async fn get_topics(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let topics: Vec<TopicResponse> = analytics::topic_shares(&state.data.topics)
        .into_iter()
        .map(|s| TopicResponse {
            topic: s.topic,
            count: s.count,
            percent: s.percent,
        })
        .collect();
    Json(topics)
}

// ── GET /api/queries — recent queries, newest first ──────────────────

#[derive(Serialize)]
pub struct QueryResponse {
    pub time: String,
    pub query: String,
    pub response_time: f64,
}

pub async fn get_queries(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let mut rows: Vec<QueryResponse> = state
        .data
        .queries
        .iter()
        .map(|q| QueryResponse {
            time: q.timestamp.format("%H:%M:%S").to_string(),
            query: q.query.clone(),
            response_time: q.response_time,
        })
        .collect();
    rows.reverse();
    Json(rows)
}
