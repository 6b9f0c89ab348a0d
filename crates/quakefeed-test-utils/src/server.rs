//! In-process prediction service for integration tests.
//!
//! Serves `GET /predict_data` on 127.0.0.1 with an ephemeral port. The default
//! behaviour simulates the real service: a sliding window of the last 10
//! predictions around the Himalayan region, an incrementing `time_step`, and the
//! MAE over the window.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Number of predictions the simulated service keeps.
pub const WINDOW: usize = 10;

#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Sliding-window simulation.
    Simulate,
    /// Always answer 200 with this body.
    Fixed(Value),
    /// Always answer with this status and an error body.
    Status(u16),
    /// Answer 200 with a body that is not JSON.
    Malformed,
}

#[derive(Debug, Clone, Serialize)]
struct SimPoint {
    time_step: u64,
    predicted: f64,
    actual: f64,
    latitude: f64,
    longitude: f64,
    absolute_error: f64,
}

/// Deterministic stand-in for the prediction model.
pub struct Simulator {
    rng: StdRng,
    counter: u64,
    window: VecDeque<SimPoint>,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), counter: 0, window: VecDeque::with_capacity(WINDOW) }
    }

    /// Produce the next response body.
    pub fn next_body(&mut self) -> Value {
        self.counter += 1;
        let actual: f64 = self.rng.gen_range(3.0..6.5);
        let predicted = actual + self.rng.gen_range(-0.3..0.3);
        let point = SimPoint {
            time_step: self.counter,
            predicted,
            actual,
            latitude: self.rng.gen_range(30.0..33.0),
            longitude: self.rng.gen_range(75.0..79.0),
            absolute_error: (predicted - actual).abs(),
        };

        if self.window.len() == WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(point.clone());

        let mae = self.window.iter().map(|p| p.absolute_error).sum::<f64>() / self.window.len() as f64;
        serde_json::json!({
            "prediction": point.predicted,
            "actual": point.actual,
            "latitude": point.latitude,
            "longitude": point.longitude,
            "mae": mae,
            "predictions_data": self.window,
        })
    }
}

struct MockState {
    behaviour: Mutex<Behaviour>,
    delay: Mutex<Option<Duration>>,
    simulator: Mutex<Simulator>,
    hits: AtomicUsize,
}

async fn predict_data(State(state): State<Arc<MockState>>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let delay = *state.delay.lock().expect("mock delay poisoned");
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let behaviour = state.behaviour.lock().expect("mock behaviour poisoned").clone();
    match behaviour {
        Behaviour::Simulate => {
            let body = state.simulator.lock().expect("mock simulator poisoned").next_body();
            Json(body).into_response()
        }
        Behaviour::Fixed(body) => Json(body).into_response(),
        Behaviour::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(serde_json::json!({ "error": "simulated failure" }))).into_response()
        }
        Behaviour::Malformed => (StatusCode::OK, "<html>not json</html>").into_response(),
    }
}

pub struct MockPredictionServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockPredictionServer {
    pub async fn start(behaviour: Behaviour) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            behaviour: Mutex::new(behaviour),
            delay: Mutex::new(None),
            simulator: Mutex::new(Simulator::new(42)),
            hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/predict_data", get(predict_data))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state, handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.state.behaviour.lock().expect("mock behaviour poisoned") = behaviour;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.state.delay.lock().expect("mock delay poisoned") = delay;
    }
}

impl Drop for MockPredictionServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
