mod assets;

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info};

use crate::{
    aggregate::{aggregate, labelled_series, AggregateResult, LabelledSeries},
    engine::EngineBuilder,
    estimate::RunResult,
    scenario::Scenario,
};

/// Sent to subscribers each time a simulation finishes.
#[derive(Clone, Serialize)]
pub struct RunFrame {
    pub index: usize,
    pub label: String,
    pub seed: Option<u64>,
    pub final_estimate: Option<f64>,
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub total_runs: usize,
    pub completed_runs: usize,
    pub completed: bool,
    pub area_ratio: f64,
    pub aggregate: Option<AggregateResult>,
}

struct AppState {
    broadcaster: broadcast::Sender<String>,
    runs: Mutex<Vec<RunResult>>,
    total_runs: usize,
    scenario_name: String,
    area_ratio: f64,
    simulation_done: AtomicBool,
}

impl AppState {
    fn new(scenario_name: String, total_runs: usize, area_ratio: f64) -> Self {
        let (broadcaster, _) = broadcast::channel(512);
        Self {
            broadcaster,
            runs: Mutex::new(Vec::new()),
            total_runs,
            scenario_name,
            area_ratio,
            simulation_done: AtomicBool::new(false),
        }
    }

    /// Stores a finished run and announces it to every subscriber.
    fn record_run(&self, index: usize, run: &RunResult) {
        lock(&self.runs).push(run.clone());
        let frame = RunFrame {
            index,
            label: format!("Simulation #{}", index + 1),
            seed: run.seed,
            final_estimate: run.final_estimate(),
        };
        if let Ok(payload) = serde_json::to_string(&frame) {
            let _ = self.broadcaster.send(payload);
        }
    }
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub samples: Option<u64>,
    pub simulations: Option<u64>,
    pub host: String,
    pub port: u16,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        samples,
        simulations,
        host,
        port,
    } = config;

    let engine = EngineBuilder::new(scenario.engine_settings(samples)?)
        .with_regions(scenario.build_regions()?)
        .build()?;
    let simulations = usize::try_from(scenario.simulations(simulations))
        .context("Simulation count does not fit in memory")?;
    let seeds = scenario.seed_tree()?.children(scenario.seed, simulations);
    let area_ratio = engine.regions().area_ratio();

    let state = Arc::new(AppState::new(scenario.name.clone(), simulations, area_ratio));

    let sim_state = state.clone();
    let sim_handle = tokio::task::spawn_blocking(move || {
        engine.run_with_hook(&seeds, |index, run| sim_state.record_run(index, run));
        sim_state.simulation_done.store(true, Ordering::SeqCst);
    });

    let scenario_label = scenario.name.clone();
    tokio::spawn(async move {
        match sim_handle.await {
            Ok(()) => info!(scenario = %scenario_label, "simulations completed"),
            Err(err) => error!(?err, "simulation task failed"),
        }
    });

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;

    info!("estimate viewer live at http://{host}:{port} (Ctrl+C to stop)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/app.js", get(script))
        .route("/api/state", get(latest_state))
        .route("/api/runs", get(all_runs))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down estimate viewer");
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn script() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        assets::APP_JS,
    )
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let runs = lock(&state.runs);
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        total_runs: state.total_runs,
        completed_runs: runs.len(),
        completed: state.simulation_done.load(Ordering::SeqCst),
        area_ratio: state.area_ratio,
        aggregate: aggregate(&runs).ok(),
    })
}

async fn all_runs(State(state): State<Arc<AppState>>) -> Json<Vec<LabelledSeries>> {
    Json(labelled_series(&lock(&state.runs)))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::engine::EngineSettings;

    fn finished_runs(count: usize) -> Vec<RunResult> {
        let engine = EngineBuilder::new(EngineSettings {
            samples: 20,
            ..EngineSettings::default()
        })
        .build()
        .unwrap();
        engine.run_many(&(1..=count as u64).collect::<Vec<_>>())
    }

    fn close(value: &Value, expected: Option<f64>) -> bool {
        match (value.as_f64(), expected) {
            (Some(a), Some(b)) => (a - b).abs() < 1e-12,
            _ => false,
        }
    }

    fn state_with(runs: &[RunResult]) -> Arc<AppState> {
        let state = AppState::new("live".into(), 3, 3.0);
        for (idx, run) in runs.iter().enumerate() {
            state.record_run(idx, run);
        }
        Arc::new(state)
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> Value {
        let response = router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn state_before_any_run_has_no_aggregate() {
        let body = get_json(state_with(&[]), "/api/state").await;
        assert_eq!(body["completed_runs"], 0);
        assert_eq!(body["total_runs"], 3);
        assert_eq!(body["completed"], false);
        assert!(body["aggregate"].is_null());
    }

    #[tokio::test]
    async fn state_averages_the_runs_finished_so_far() {
        let runs = finished_runs(2);
        let body = get_json(state_with(&runs[..1]), "/api/state").await;
        assert_eq!(body["completed_runs"], 1);
        assert_eq!(body["aggregate"]["runs"], 1);
        assert!(close(
            &body["aggregate"]["estimate"][19],
            runs[0].final_estimate()
        ));

        let body = get_json(state_with(&runs), "/api/state").await;
        assert_eq!(body["completed_runs"], 2);
        assert_eq!(body["aggregate"]["runs"], 2);
        let expected = aggregate(&runs).unwrap().final_estimate();
        assert!(close(&body["aggregate"]["estimate"][19], expected));
    }

    #[tokio::test]
    async fn runs_are_labelled_in_completion_order() {
        let runs = finished_runs(2);
        let body = get_json(state_with(&runs), "/api/runs").await;
        let series = body.as_array().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0]["label"], "Simulation #1");
        assert_eq!(series[1]["label"], "Simulation #2");
        assert_eq!(series[1]["seed"], 2);
    }

    #[tokio::test]
    async fn each_recorded_run_is_broadcast() {
        let state = state_with(&[]);
        let mut rx = state.broadcaster.subscribe();
        let runs = finished_runs(1);
        state.record_run(0, &runs[0]);

        let frame: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["index"], 0);
        assert_eq!(frame["label"], "Simulation #1");
        assert_eq!(frame["seed"], 1);
        assert!(close(&frame["final_estimate"], runs[0].final_estimate()));
    }

    #[tokio::test]
    async fn events_endpoint_streams_server_sent_events() {
        let response = router(state_with(&[]))
            .oneshot(Request::get("/api/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
    }

    #[tokio::test]
    async fn page_and_script_are_served() {
        let response = router(state_with(&[]))
            .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("/api/events"));
    }
}
