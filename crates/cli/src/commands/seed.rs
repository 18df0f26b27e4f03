use crate::commands::{prepare, CommandResult};
use shelf_db::{
    connect_with_settings, migrations, DemoCatalog, ProductRepository, SeedResult,
    SqlProductRepository,
};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlProductRepository::new(pool.clone());
        let seeded = DemoCatalog::load(&repository)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        let mut missing = Vec::new();
        for name in DemoCatalog::names() {
            let found = repository
                .find_by_name(name)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
            if found.is_none() {
                missing.push(name);
            }
        }

        pool.close().await;
        if missing.is_empty() {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_message(&missing), 6u8))
        }
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    let mut lines = vec![format!(
        "demo catalog ready: {} inserted, {} already present",
        seeded.inserted.len(),
        seeded.skipped.len()
    )];
    lines.extend(DemoCatalog::names().map(|name| format!("  - {name}")));
    lines.join("\n")
}

fn verification_message(missing: &[&str]) -> String {
    format!("seed verification failed, products missing after load: {}", missing.join(", "))
}

#[cfg(test)]
mod tests {
    use shelf_db::{DemoCatalog, SeedResult};

    use super::{summary, verification_message};

    #[test]
    fn summary_counts_inserted_and_skipped_products() {
        let seeded = SeedResult { inserted: vec!["Widget", "Gadget"], skipped: vec!["Gizmo"] };

        let message = summary(&seeded);

        assert!(message.starts_with("demo catalog ready: 2 inserted, 1 already present"));
        for name in DemoCatalog::names() {
            assert!(message.contains(&format!("  - {name}")));
        }
    }

    #[test]
    fn verification_message_lists_missing_products() {
        assert_eq!(
            verification_message(&["Widget Pro", "Gizmo"]),
            "seed verification failed, products missing after load: Widget Pro, Gizmo"
        );
    }
}
