//! Logs a few records the way a Cloud Run service would.
//!
//! Run with `K_SERVICE=demo` to get structured JSON output, without it to get plain lines.

use run_logger::{
    emit, emit_fmt, emit_with_fields, field, CloudLoggingLayer, Emitter, Logger, Severity,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Order<'a> {
    id: u64,
    items: &'a [&'a str],
}

fn main() {
    let logger = Logger::from_env();

    logger.info(&[&"Hello", &"world"]);
    logger.notice_fmt(format_args!("listening on port {}", 8080));

    let order = Order {
        id: 42,
        items: &["coffee", "bagel"],
    };
    logger.warning_with_fields(
        "order is taking long",
        [field("order", &order), field("elapsed_ms", 1250)],
    );

    emit!(logger, Severity::Debug, "cache warmed with", 128, "entries");
    emit_fmt!(logger, Severity::Info, "processed {} orders", 17);
    emit_with_fields!(logger, Severity::Error, "payment declined", {
        "code" => 402,
        "order_id" => order.id,
    });

    tracing_subscriber::registry()
        .with(CloudLoggingLayer::new(Logger::from_env()))
        .init();

    let span = tracing::info_span!("checkout");
    let _entered = span.enter();
    tracing::info!(order_id = order.id, "order shipped");
}
