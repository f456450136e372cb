use serde_json::Value;

use crate::data::Record;

pub(crate) fn record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        other => panic!("expected an object, got {other}"),
    }
}

#[cfg(feature = "ssr")]
mod server;
