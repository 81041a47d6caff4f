//! CLI tool to create a superuser.
//!
//! Usage:
//!   cargo run --bin create-superuser -- --email <email> --password <password>
//!   cargo run --bin create-superuser -- --email <email> --password <password> --first-name Ada --last-name Lovelace

use std::env;

use shop_identity_lib::config::Config;
use shop_identity_lib::db::{DbPool, profiles};
use shop_identity_lib::models::user::ExtraUserFields;
use shop_identity_lib::services::user_manager;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let email = required_arg(&args, "--email");
    let password = required_arg(&args, "--password");
    let extra = ExtraUserFields {
        first_name: optional_arg(&args, "--first-name"),
        last_name: optional_arg(&args, "--last-name"),
        ..ExtraUserFields::default()
    };

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    let user = match user_manager::create_superuser(
        pool.connection(),
        Some(email.as_str()),
        Some(password.as_str()),
        extra,
    )
    .await
    {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Error creating superuser: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = profiles::get_or_create(pool.connection(), user.id).await {
        eprintln!("Superuser created but profile creation failed: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("Superuser created successfully!");
    println!();
    println!("  ID:       {}", user.id);
    println!("  Email:    {}", user.email);
    println!("  Username: {}", user.username);
    println!();
}

fn optional_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn required_arg(args: &[String], flag: &str) -> String {
    match optional_arg(args, flag) {
        Some(v) => v,
        None => {
            eprintln!("Error: {} is required", flag);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Create a superuser");
    println!();
    println!("USAGE:");
    println!("    create-superuser --email <EMAIL> --password <PASSWORD> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --first-name <NAME>    Given name");
    println!("    --last-name <NAME>     Family name");
    println!("    -h, --help             Print help");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_ENV, DATABASE_URL and the other server variables are read as usual");
}
