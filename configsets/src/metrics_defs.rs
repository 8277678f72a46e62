//! Metrics definitions for the configsets API.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "configsets.requests",
    metric_type: MetricType::Counter,
    description: "Number of configset API requests. Tagged with action.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "configsets.request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status.",
};

pub const QUEUE_WAIT_DURATION: MetricDef = MetricDef {
    name: "configsets.queue.wait.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent waiting for a queued operation to be applied, in seconds. Tagged with operation.",
};

pub const QUEUE_TIMEOUTS: MetricDef = MetricDef {
    name: "configsets.queue.timeouts",
    metric_type: MetricType::Counter,
    description: "Number of queued operations that received no response before the timeout",
};

pub const QUEUE_INTERRUPTIONS: MetricDef = MetricDef {
    name: "configsets.queue.interruptions",
    metric_type: MetricType::Counter,
    description: "Number of queued operations interrupted by a watch notification",
};

pub const UPLOAD_FILES_WRITTEN: MetricDef = MetricDef {
    name: "configsets.upload.files_written",
    metric_type: MetricType::Counter,
    description: "Number of files written by configset uploads",
};

pub const UPLOAD_FILES_DELETED: MetricDef = MetricDef {
    name: "configsets.upload.files_deleted",
    metric_type: MetricType::Counter,
    description: "Number of stale files removed by configset uploads with cleanup",
};

pub const TRUST_PROMOTIONS: MetricDef = MetricDef {
    name: "configsets.upload.trust_promotions",
    metric_type: MetricType::Counter,
    description: "Number of untrusted configsets promoted to trusted by a full trusted overwrite",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS,
    REQUEST_DURATION,
    QUEUE_WAIT_DURATION,
    QUEUE_TIMEOUTS,
    QUEUE_INTERRUPTIONS,
    UPLOAD_FILES_WRITTEN,
    UPLOAD_FILES_DELETED,
    TRUST_PROMOTIONS,
];
