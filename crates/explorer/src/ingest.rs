//! Typed appends for whatever feeds the store.

use chainstore::ChainWriter;

use crate::error::ExplorerResult;
use crate::types::ChainRecord;

/// Stages `record` on `writer`, returning the height it was assigned.
/// Nothing is visible to readers until the writer commits.
pub fn append_record<R: ChainRecord>(writer: &mut ChainWriter<'_>, record: &R) -> ExplorerResult<u64> {
    let payload = record.encode()?;
    let height = writer.append(R::KIND, &record.key_bytes(), record.parent(), &payload)?;
    Ok(height)
}
