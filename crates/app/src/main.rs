//! Furlough administrative CLI.

use std::process;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use furlough_app::{
    database,
    domain::{
        companies::records::{CompanyUuid, NewCompany},
        companies::repository::PgCompaniesRepository,
        users::records::{NewUser, Role, UserUuid},
        users::repository::PgUsersRepository,
    },
    password::{HashParams, PasswordHasher},
};

#[derive(Debug, Parser)]
#[command(name = "furlough-app", about = "Furlough CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate(MigrateArgs),

    /// Create a company and its first admin account.
    SeedAdmin(SeedAdminArgs),
}

#[derive(Debug, Args)]
struct MigrateArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

#[derive(Debug, Args)]
struct SeedAdminArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Company display name
    #[arg(long, env = "SEED_COMPANY_NAME")]
    company_name: String,

    /// Company slug; derived from the name when omitted
    #[arg(long)]
    company_slug: Option<String>,

    /// Admin email address
    #[arg(long, env = "SEED_ADMIN_EMAIL")]
    email: String,

    /// Admin password; must satisfy the password policy
    #[arg(long, env = "SEED_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    /// Admin first name
    #[arg(long, default_value = "Admin")]
    first_name: String,

    /// Admin last name
    #[arg(long, default_value = "User")]
    last_name: String,
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Migrate(args) => migrate(args).await,
        Commands::SeedAdmin(args) => seed_admin(args).await,
    }
}

async fn migrate(args: MigrateArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    database::migrate(&pool)
        .await
        .map_err(|error| format!("migration failed: {error}"))?;

    println!("migrations applied");

    Ok(())
}

async fn seed_admin(args: SeedAdminArgs) -> Result<(), String> {
    PasswordHasher::check_policy(&args.password).map_err(|error| error.to_string())?;

    let hasher = PasswordHasher::new(HashParams::default());
    let password_hash = hasher
        .hash(&args.password)
        .map_err(|error| format!("failed to hash password: {error}"))?;

    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let slug = args
        .company_slug
        .unwrap_or_else(|| slugify(&args.company_name));

    let companies = PgCompaniesRepository::new();
    let users = PgUsersRepository::new();

    let mut tx = pool
        .begin()
        .await
        .map_err(|error| format!("failed to begin transaction: {error}"))?;

    let company = match companies
        .find_by_slug(&mut tx, &slug)
        .await
        .map_err(|error| format!("failed to look up company: {error}"))?
    {
        Some(existing) => existing,
        None => companies
            .create_company(
                &mut tx,
                &NewCompany {
                    uuid: CompanyUuid::new(),
                    name: args.company_name.clone(),
                    slug: slug.clone(),
                    domain: None,
                },
            )
            .await
            .map_err(|error| format!("failed to create company: {error}"))?,
    };

    let admin = users
        .insert_user(
            &mut tx,
            &NewUser {
                uuid: UserUuid::new(),
                company_uuid: company.uuid,
                function_uuid: None,
                email: args.email.clone(),
                password_hash: Some(password_hash),
                first_name: args.first_name,
                last_name: args.last_name,
                role: Role::Admin,
                is_active: true,
                email_verified: true,
            },
        )
        .await
        .map_err(|error| format!("failed to create admin user: {error}"))?;

    tx.commit()
        .await
        .map_err(|error| format!("failed to commit: {error}"))?;

    println!("company_uuid: {}", company.uuid);
    println!("company_slug: {}", company.slug);
    println!("admin_uuid: {}", admin.uuid);
    println!("admin_email: {}", admin.email);

    Ok(())
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if (c == ' ' || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-').to_string();

    if slug.is_empty() {
        format!("company-{}", Uuid::now_v7().simple())
    } else {
        slug
    }
}
