use std::net::SocketAddr;

// ── Engine ──────────────────────────────────────────────────────

/// Counter: advisory availability checks. Labels: outcome.
pub const AVAILABILITY_CHECKS_TOTAL: &str = "rentavail_availability_checks_total";

/// Histogram: candidate windows tried per forward search.
pub const SEARCH_ATTEMPTS: &str = "rentavail_search_attempts";

/// Counter: alternative windows suggested.
pub const SUGGESTIONS_TOTAL: &str = "rentavail_suggestions_total";

// ── Service ─────────────────────────────────────────────────────

/// Counter: service queries. Labels: query, status.
pub const QUERIES_TOTAL: &str = "rentavail_queries_total";

/// Histogram: service query latency in seconds. Labels: query.
pub const QUERY_DURATION_SECONDS: &str = "rentavail_query_duration_seconds";

// ── Store ───────────────────────────────────────────────────────

/// Counter: reservation commits. Labels: outcome.
pub const COMMITS_TOTAL: &str = "rentavail_commits_total";

/// Counter: pending reservations expired by the reaper.
pub const RESERVATIONS_EXPIRED_TOTAL: &str = "rentavail_reservations_expired_total";

/// Counter: WAL compactions.
pub const WAL_COMPACTIONS_TOTAL: &str = "rentavail_wal_compactions_total";

// ── Cache ───────────────────────────────────────────────────────

/// Counter: cache lookups. Labels: result (hit, miss).
pub const CACHE_LOOKUPS_TOTAL: &str = "rentavail_cache_lookups_total";

/// Counter: cache entries dropped by store events.
pub const CACHE_INVALIDATIONS_TOTAL: &str = "rentavail_cache_invalidations_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Record one service query's latency and outcome.
pub fn record_query<T, E>(query: &'static str, started: std::time::Instant, result: &Result<T, E>) {
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(QUERIES_TOTAL, "query" => query, "status" => status).increment(1);
    metrics::histogram!(QUERY_DURATION_SECONDS, "query" => query)
        .record(started.elapsed().as_secs_f64());
}
