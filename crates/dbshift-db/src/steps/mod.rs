//! The upgrade sequence shipped with [`SqlStore`](crate::SqlStore).
//!
//! Append only. Index `i` upgrades version `i` to `i + 1`, and stores in the
//! field have already recorded passing every released index.

mod v1_device_schema;
mod v2_account_sig_key_backfill;

pub use v1_device_schema::DeviceSchema;
pub use v2_account_sig_key_backfill::account_sig_key_backfill;

use crate::migrations::Migration;

pub fn default_migrations() -> Vec<Box<dyn Migration>> {
    vec![Box::new(DeviceSchema), Box::new(account_sig_key_backfill())]
}

/// Version of a store that has applied every built-in step.
pub fn latest_version() -> u32 {
    default_migrations().len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_order_is_stable() {
        let names: Vec<String> = default_migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["device_schema", "account_sig_key_backfill"]);
        assert_eq!(latest_version(), 2);
    }
}
