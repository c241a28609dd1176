use tenon_primitives::buf::Buf20;
use tenon_state::{ExecutionHead, WithdrawalEntry};

use crate::{
    define_table_with_default_codec, define_table_with_seek_key_codec, define_table_without_codec,
    impl_borsh_value_codec,
};

define_table_with_default_codec!(
    /// Table to store the execution chain head singleton
    (ExecutionHeadSchema) u64 => ExecutionHead
);

define_table_with_seek_key_codec!(
    /// Table to store pending withdrawal requests keyed by insertion order
    (WithdrawalSchema) u64 => WithdrawalEntry
);

define_table_with_default_codec!(
    /// Table to map a withdrawal address to the ids of its pending withdrawals
    (WithdrawalAddrIndexSchema) Buf20 => Vec<u64>
);
