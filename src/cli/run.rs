//! Run command handler.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::config::Config;
use crate::migrations::{create_register, run_all, run_steps, StepContext};
use crate::store::backends::connect;

use super::App;

impl App {
    /// Run the named steps, or every step with `--all`.
    pub async fn run_migration(&self, steps: &[String], all: bool, dry_run: bool) -> Result<()> {
        let config = Config::load_with(self.config.as_deref())?;
        let dry_run = dry_run || config.migration.dry_run;

        let store = connect(&config.store)
            .await
            .wrap_err("Failed to open store")?;

        let register = create_register();
        let ctx = StepContext::new(store.as_ref(), &config.collections).dry_run(dry_run);

        let reports = if all {
            run_all(&register, &ctx).await
        } else {
            run_steps(&register, steps, &ctx).await
        }
        .wrap_err("Migration failed")?;

        for report in &reports {
            println!(
                "{}{}: visited={} queued={} matched={} modified={} ({} ms)",
                report.id,
                if report.dry_run { " [dry run]" } else { "" },
                report.stats.visited,
                report.stats.queued,
                report.stats.matched,
                report.stats.modified,
                report.elapsed().num_milliseconds()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Command;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_store_failure_keeps_error_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[store]\ntype = \"files\"\npath = {:?}\n",
                dir.path().join("missing-dump")
            ),
        )
        .unwrap();
        let app = App {
            verbose: false,
            config: Some(config),
            command: Command::List,
        };

        let err = app.run_migration(&[], true, false).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to open store");
        assert!(matches!(
            err.root_cause().downcast_ref::<AppError>(),
            Some(AppError::Store(_))
        ));
    }
}
