/// Wall-clock Unix epoch in milliseconds, used for wire timestamps only.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
