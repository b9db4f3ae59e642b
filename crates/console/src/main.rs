//! Headless back-office console: sign in against an in-memory provider and
//! print what the resolved user may do.
//!
//! Usage: `rxoffice-console [email] [password]`
//!
//! - `RXOFFICE_ACCESS_FILE`: load/save the user directory and overrides
//! - `RXOFFICE_FLAGS_FILE`: persist session flags to this JSON file

use std::sync::Arc;

use anyhow::Context;

use rxoffice_auth::{Action, Module, NewUser, PermissionGrid, RbacRegistry, Role};
use rxoffice_infra::{AccessControl, FlagStore, InMemoryFlagStore, JsonFileFlagStore};
use rxoffice_session::{
    GuardDecision, InMemoryIdentityProvider, RouteGuard, SessionConfig, SessionManager,
    TracingNotifier,
};

const DEMO_PASSWORD: &str = "pharmacy";

const DEMO_STAFF: [(&str, &str, &str, Role); 4] = [
    ("1", "Ada Admin", "admin@pharmacy.test", Role::Administrator),
    ("2", "Phil Pharmacist", "pharm@pharmacy.test", Role::Pharmacist),
    ("3", "Tess Technician", "tech@pharmacy.test", Role::PharmacyTechnician),
    ("4", "Cass Cashier", "cash@pharmacy.test", Role::Cashier),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rxoffice_observability::init();

    let mut args = std::env::args().skip(1);
    let email = args.next().unwrap_or_else(|| "admin@pharmacy.test".to_string());
    let password = args.next().unwrap_or_else(|| DEMO_PASSWORD.to_string());

    let config = SessionConfig::from_env();
    let access_file = std::env::var("RXOFFICE_ACCESS_FILE").ok();

    let access = Arc::new(AccessControl::in_memory());
    let loaded = match &access_file {
        Some(path) => access.load_if_present(path)?,
        None => false,
    };
    if !loaded {
        seed_demo_staff(&access)?;
    }

    let flags: Arc<dyn FlagStore> = match std::env::var("RXOFFICE_FLAGS_FILE") {
        Ok(path) => Arc::new(JsonFileFlagStore::open(&path).with_context(|| format!("opening {path}"))?),
        Err(_) => Arc::new(InMemoryFlagStore::new()),
    };

    let provider = Arc::new(InMemoryIdentityProvider::new());
    for user in access.list_users() {
        provider.register_with_id(user.id.as_str(), &user.email, DEMO_PASSWORD);
    }

    let guard = RouteGuard::from_config(&config);
    let manager = SessionManager::new(
        provider,
        access.clone(),
        flags,
        Arc::new(TracingNotifier),
        config,
    );
    let tasks = manager.start().await;

    let mut rx = manager.subscribe();
    guard.settle(&mut rx).await;

    if let Err(e) = manager.login(&email, &password).await {
        anyhow::bail!("sign-in failed for {email}: {e}");
    }

    // A login kicks off resolution; wait for it to settle.
    let _ = rx.wait_for(|s| s.external.is_some() || s.ended.is_some()).await;
    match guard.settle(&mut rx).await {
        GuardDecision::Render => {}
        other => anyhow::bail!("no usable session for {email}: {other:?}"),
    }

    let state = manager.snapshot();
    let user = state
        .local_user
        .as_ref()
        .context("authenticated session without a local user")?;
    println!("Signed in as {} <{}> ({})", user.name, user.email, user.role);

    let grid = state.permissions.clone().unwrap_or_else(PermissionGrid::deny_all);
    print_grid(&grid);

    let registry = RbacRegistry::builtin();
    println!("\nRoles:");
    for def in &registry.roles {
        println!("  {:<20} {}", def.role.as_str(), def.description);
    }

    let explanation = manager.explain("users", "delete");
    println!("\nusers.delete: {}", serde_json::to_string_pretty(&explanation)?);

    manager.logout().await;
    tasks.abort();

    if let Some(path) = &access_file {
        access.save_to_path(path)?;
        tracing::info!(path = %path, "access snapshot saved");
    }

    Ok(())
}

fn seed_demo_staff(access: &AccessControl) -> anyhow::Result<()> {
    for (id, name, email, role) in DEMO_STAFF {
        access
            .add_user(NewUser::new(name, email, role).with_id(id))
            .with_context(|| format!("seeding {email}"))?;
    }
    Ok(())
}

fn print_grid(grid: &PermissionGrid) {
    println!("\n{:<15} view  add   edit  delete", "module");
    for module in Module::ALL {
        let cells: Vec<&str> = Action::ALL
            .into_iter()
            .map(|action| {
                if grid.allows(module, action) {
                    "yes"
                } else {
                    "-"
                }
            })
            .collect();
        println!(
            "{:<15} {:<5} {:<5} {:<5} {:<5}",
            module.as_str(),
            cells[0],
            cells[1],
            cells[2],
            cells[3]
        );
    }
}
