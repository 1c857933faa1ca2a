use serde_json::Value;
use uuid::Uuid;

use strata_db::jira::models::RawPayload;
use strata_db::jira::repositories::RawPayloadRepository;

/// Keep one verbatim copy of a fetch. Failing to store it never fails the sync.
pub async fn record_raw<S>(store: &S, board_id: Option<Uuid>, data_type: &str, items: &[Value])
where
    S: RawPayloadRepository + ?Sized,
{
    let payload = RawPayload::new(board_id, data_type, Value::Array(items.to_vec()));
    if let Err(e) = store.record_payload(&payload).await {
        tracing::warn!(error = %e, data_type, ?board_id, "failed to record raw payload");
    }
}
