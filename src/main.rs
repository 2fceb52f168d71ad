use clap::Parser;
use tollgate::cli::{
    Args, build_config, handle_enable_user, init_logging, load_jwt_secret, open_database,
    parse_cors_origin,
};
use tollgate::{create_app, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let cors_origin = match parse_cors_origin(&args.cors_origin) {
        Ok(origin) => origin,
        Err(e) => {
            error!(origin = %args.cors_origin, error = %e, "Invalid CORS origin");
            std::process::exit(1);
        }
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.enable_user.as_deref() {
        handle_enable_user(&db, email).await;
    }

    let config = build_config(db, jwt_secret, args.token_ttl_ms, cors_origin);
    let app = match create_app(&config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, ttl_ms = args.token_ttl_ms, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    if let Err(e) = run_server(app, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
