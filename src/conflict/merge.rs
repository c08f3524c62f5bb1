use super::{ConflictContext, ConflictDecision, ConflictResolver};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Per-field three-way merge.
///
/// The rebuilt value starts from the remote record. Every field the caller
/// changed is reapplied unless the remote also changed that field since the
/// caller's read, in which case the remote value stays. Fields the caller did
/// not touch always come from the remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldLevelMerge;

impl FieldLevelMerge {
    fn merge_fields(
        original: &Map<String, Value>,
        intended: &Map<String, Value>,
        remote: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut merged = remote.clone();
        for (field, ours) in intended {
            let base = original.get(field);
            if base == Some(ours) {
                continue;
            }
            if remote.get(field) != base {
                continue;
            }
            merged.insert(field.clone(), ours.clone());
        }
        merged
    }
}

impl<T> ConflictResolver<T> for FieldLevelMerge
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn name(&self) -> &'static str {
        "field_level_merge"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        let encoded = (
            serde_json::to_value(ctx.original),
            serde_json::to_value(ctx.intended),
            serde_json::to_value(&ctx.remote.value),
        );
        let (original, intended, remote) = match encoded {
            (Ok(Value::Object(o)), Ok(Value::Object(i)), Ok(Value::Object(r))) => (o, i, r),
            (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
                return ConflictDecision::Abort(format!("field merge encode failed: {err}"));
            }
            _ => {
                return ConflictDecision::Abort(
                    "field merge requires struct-like payloads".to_string(),
                );
            }
        };

        let merged = Self::merge_fields(&original, &intended, &remote);
        match serde_json::from_value(Value::Object(merged)) {
            Ok(value) => ConflictDecision::RetryWithFreshBaseline(value),
            Err(err) => ConflictDecision::Abort(format!("field merge decode failed: {err}")),
        }
    }
}
