use crate::migrations::RetiredMigration;

/// v1 -> v2. Originally added `adv_account_sig_key` to `store_device` and
/// backfilled it per dialect. The change was withdrawn before it could run
/// anywhere, but stores already record v2, so the slot stays as a no-op.
pub fn account_sig_key_backfill() -> RetiredMigration {
    RetiredMigration::new("account_sig_key_backfill")
}
