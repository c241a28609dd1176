use rockbound::{Schema, TransactionCtx, TransactionDBMarker};

use crate::{define_table_with_default_codec, define_table_without_codec, impl_borsh_value_codec};

define_table_with_default_codec!(
    /// Last id handed out per table, keyed by column family name
    (SequenceSchema) Vec<u8> => u64
);

/// Allocates the next id for table `S` inside the surrounding transaction.
///
/// The counter row is read with `get_for_update`, so competing transactions
/// conflict and retry rather than observe the same id. The first allocation
/// returns 0. Callers must never write the counter row directly.
pub(crate) fn get_next_id<S: Schema, DB: TransactionDBMarker>(
    txn: &TransactionCtx<DB>,
) -> anyhow::Result<u64> {
    let counter_key = S::COLUMN_FAMILY_NAME.as_bytes().to_vec();
    let id = match txn.get_for_update::<SequenceSchema>(&counter_key)? {
        Some(last) => last + 1,
        None => 0,
    };
    txn.put::<SequenceSchema>(&counter_key, &id)?;
    Ok(id)
}
