use std::{
    ops::RangeInclusive,
    time::{
        SystemTime,
        UNIX_EPOCH,
    },
};

use crate::{
    document::Document,
    schema::fields,
};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Sample documents for the default schema: id `i`, title `Document<i>`,
/// status `status<i>`, stamped with the current time.
pub fn numbered_documents(ids: RangeInclusive<u64>) -> Vec<Document> {
    let time = now_millis();
    ids.map(|i| {
        Document::new()
            .with(fields::ID, i.to_string())
            .with(fields::TITLE, format!("Document{i}"))
            .with(fields::STATUS, format!("status{i}"))
            .with(fields::TIME, time)
    })
    .collect()
}
