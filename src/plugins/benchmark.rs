//! Rough timing of multi-step operations.
//!
//! [`Benchmarking::benchmark`] starts a [`Benchmark`] on the client's clock;
//! each [`Benchmark::step`] records the time since start and since the
//! previous step, and [`Benchmark::stop`] records a final step and sends a
//! `benchmark.report` through the `benchmark` feature.
//!
//! ```ignore
//! let mut bench = client.benchmark("load settings")?;
//! read_file();
//! bench.step("read");
//! parse();
//! bench.stop(&mut client, "parsed")?;
//! ```

use serde::Serialize;
use serde_json::{json, Value};

use crate::client::Client;
use crate::command::command_type;
use crate::error::ClientError;
use crate::plugin::{arg, arg_str, creator, Features, Plugin, PluginCreator};
use crate::timer::Stopwatch;

/// One timed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkStep {
    /// Step label.
    pub title: String,
    /// Milliseconds since the benchmark started.
    pub time: f64,
    /// Milliseconds since the previous step.
    pub delta: f64,
}

/// A running benchmark.
#[derive(Debug, Clone)]
pub struct Benchmark {
    title: String,
    watch: Stopwatch,
    steps: Vec<BenchmarkStep>,
}

impl Benchmark {
    fn start(title: &str, watch: Stopwatch) -> Self {
        Self {
            title: title.to_string(),
            watch,
            steps: vec![BenchmarkStep {
                title: title.to_string(),
                time: 0.0,
                delta: 0.0,
            }],
        }
    }

    /// Record a step.
    pub fn step(&mut self, title: impl Into<String>) {
        let previous = self.steps.last().map_or(0.0, |step| step.time);
        let time = self.watch.elapsed_ms();
        self.steps.push(BenchmarkStep {
            title: title.into(),
            time,
            delta: time - previous,
        });
    }

    /// Record a final step and send the report.
    pub fn stop(mut self, client: &mut Client, title: impl Into<String>) -> Result<(), ClientError> {
        self.step(title);
        let steps = serde_json::to_value(&self.steps)?;
        client
            .call_feature("benchmark", &[Value::String(self.title), steps])
            .map(drop)
    }

    /// Steps recorded so far, including the implicit starting step.
    pub fn steps(&self) -> &[BenchmarkStep] {
        &self.steps
    }
}

/// Benchmark plugin.
#[derive(Debug, Default)]
pub struct BenchmarkPlugin;

/// Creator for [`BenchmarkPlugin`].
pub fn benchmark() -> PluginCreator {
    creator(|_client| BenchmarkPlugin)
}

impl Plugin for BenchmarkPlugin {
    fn name(&self) -> &str {
        "benchmark"
    }

    fn features(&self) -> Features {
        Features::new().with("benchmark", |client, args| {
            let title = arg_str("benchmark", args, 0)?;
            client.send(
                command_type::BENCHMARK_REPORT,
                json!({ "title": title, "steps": arg(args, 1) }),
                false,
            );
            Ok(Value::Null)
        })
    }
}

/// Typed access to the benchmark feature.
pub trait Benchmarking {
    /// Start a benchmark. Fails if no plugin provides `benchmark`.
    fn benchmark(&self, title: &str) -> Result<Benchmark, ClientError>;
}

impl Benchmarking for Client {
    fn benchmark(&self, title: &str) -> Result<Benchmark, ClientError> {
        if !self.has_feature("benchmark") {
            return Err(ClientError::FeatureNotInstalled("benchmark".to_string()));
        }
        Ok(Benchmark::start(title, self.start_timer()))
    }
}
