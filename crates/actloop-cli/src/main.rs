use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use actloop_core::{
    ActionError, Context, Doer, Loop, LoopConfig, LoopError, Query, ops, query_fn, task_fn,
};
use async_trait::async_trait;
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// State guarded by the loop: hit counters per key.
#[derive(Debug, Default)]
struct Tally {
    hits: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
struct Report {
    hits: BTreeMap<String, u64>,
    stats: actloop_core::LoopStats,
}

/// Slow read: simulates I/O while holding the state, honouring its context.
struct SlowSnapshot {
    delay: Duration,
}

#[async_trait]
impl Query<Tally> for SlowSnapshot {
    type Output = BTreeMap<String, u64>;

    async fn query(self, ctx: &Context, tally: &mut Tally) -> Result<Self::Output, ActionError> {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(tally.hits.clone()),
            _ = ctx.done() => Err(ActionError::msg("snapshot abandoned")),
        }
    }
}

fn hit(key: String) -> impl actloop_core::Task<Tally> {
    task_fn(move |_, tally: &mut Tally| {
        if key.is_empty() {
            return Err(ActionError::msg("empty key"));
        }
        *tally.hits.entry(key).or_default() += 1;
        Ok(())
    })
}

async fn total<D: Doer<Tally> + ?Sized>(ctx: &Context, d: &D) -> Result<u64, LoopError> {
    ops::query(ctx, d, query_fn(|_, t: &mut Tally| Ok(t.hits.values().sum()))).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn load_config() -> Result<LoopConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(LoopConfig::from_json_str(&raw)?)
        }
        None => Ok(LoopConfig {
            queue_buffer: 32,
            name: Some("tally".to_string()),
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = load_config()?;

    // (A) loop を起動。fire-and-forget の失敗は handler 行き
    let lp = Arc::new(
        Loop::<Tally>::builder()
            .config(config)
            .error_handler(|err| tracing::warn!(error = %err, "queued hit failed"))
            .spawn(),
    );
    let ctx = Context::background();

    // (B) 複数 producer から投入
    let mut producers = Vec::new();
    for p in 0..4 {
        let lp = Arc::clone(&lp);
        let ctx = ctx.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..250 {
                let key = if i % 100 == 99 { String::new() } else { format!("key-{}", (p + i) % 5) };
                lp.queue(&ctx, hit(key)).await?;
            }
            Ok::<_, LoopError>(())
        }));
    }
    for producer in producers {
        producer.await??;
    }

    println!("total hits: {}", total(&ctx, lp.as_ref()).await?);

    // (C) deadline 付きの await: 間に合わなければ submitter だけが諦める
    let hurried = ctx.with_timeout(Duration::from_millis(5));
    match lp.query(&hurried, SlowSnapshot { delay: Duration::from_millis(50) }).await {
        Ok(_) => println!("slow snapshot finished in time"),
        Err(e) => println!("slow snapshot: {e}"),
    }

    let hits = lp.query(&ctx, SlowSnapshot { delay: Duration::from_millis(1) }).await?;

    // (D) shutdown して統計を出す
    lp.shutdown(&ctx).await?;
    let report = Report {
        hits,
        stats: lp.stats(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Err(e) = lp.queue(&ctx, hit("late".to_string())).await {
        println!("after shutdown: {e}");
    }
    Ok(())
}
