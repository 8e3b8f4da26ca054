pub mod migrations;
pub mod runner;
pub mod steps;
pub mod store;
pub mod version_store;

pub use migrations::{FnMigration, Migration, RetiredMigration, SqlMigration, StoreContext};
pub use runner::MigrationRunner;
pub use steps::{default_migrations, latest_version};
pub use store::SqlStore;
pub use version_store::{VERSION_TABLE, VersionStore};
