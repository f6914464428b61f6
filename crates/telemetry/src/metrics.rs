use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ==== Decision Pipeline Metrics ====
    pub static ref PORTAL_DECISIONS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "portal_decisions_total",
                "Total number of access decisions by outcome",
            ),
            &["outcome"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PORTAL_CANDIDATES: Histogram = {
        let metric = Histogram::with_opts(
            HistogramOpts::new(
                "portal_candidates_per_decision",
                "Number of plate candidates produced per decision",
            )
            .buckets(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PORTAL_PIPELINE_STAGE: HistogramVec = {
        let metric = HistogramVec::new(
            HistogramOpts::new(
                "portal_pipeline_stage_seconds",
                "Duration of recognition pipeline stages",
            ),
            &["stage"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Latch Metrics ====
    pub static ref PORTAL_LATCH_POLLS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "portal_latch_polls_total",
                "Total number of gate latch polls by result",
            ),
            &["result"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Upload Metrics ====
    pub static ref PORTAL_UPLOADS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "portal_uploads_total",
                "Total number of /check payloads received by kind",
            ),
            &["kind"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}
