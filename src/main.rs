// src/main.rs

mod app_state;
mod auth;
mod authz;
mod bill;
mod config;
mod credentials;
mod error;
mod lead;
mod models;
mod newsletter;
mod notifier;
mod project;
mod serialize;
mod store;
mod token;
mod user_management;
mod validation;

#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpResponse, HttpServer};
use env_logger::Env;
use log::info;

use crate::app_state::AppState;
use crate::auth::{login, logout, me, signup, Authentication};
use crate::bill::{all_bills, create_bill, my_bills, pay_bill};
use crate::credentials::Credentials;
use crate::error::json_error_handler;
use crate::lead::{create_lead, list_leads};
use crate::newsletter::add_subscriber;
use crate::project::{
    create_project, get_messages, get_project, list_projects, pay_project, post_message,
    update_project,
};
use crate::store::MongoStore;
use crate::token::TokenService;
use crate::user_management::{get_all_users, get_me, get_user_by_id};

async fn health() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Mounts every route. Shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health))
        .service(
            web::scope("/auth")
                .route("/signup", web::post().to(signup))
                .route("/login", web::post().to(login))
                .route("/me", web::get().to(me))
                .route("/logout", web::post().to(logout)),
        )
        // PROJECTS
        .service(
            web::scope("/project")
                .route("/create", web::post().to(create_project))
                .route("/all", web::get().to(list_projects))
                .route("/details/{id}", web::get().to(get_project))
                .route("/update/{id}", web::put().to(update_project))
                .route("/payment/{id}", web::post().to(pay_project))
                .route("/message", web::post().to(post_message))
                .route("/messages/{id}", web::get().to(get_messages)),
        )
        // BILLS
        .service(
            web::scope("/bill")
                .route("/create", web::post().to(create_bill))
                .route("/my", web::get().to(my_bills))
                .route("/all", web::get().to(all_bills))
                .route("/payment/{id}", web::put().to(pay_bill)),
        )
        .service(
            web::scope("/lead")
                .route("/create", web::post().to(create_lead))
                .route("/all", web::get().to(list_leads)),
        )
        .service(web::scope("/newsletter").route("/subscribe", web::post().to(add_subscriber)))
        // USERS
        .service(
            web::scope("/user")
                .route("/me", web::get().to(get_me))
                .route("/details/{id}", web::get().to(get_user_by_id))
                .route("/all", web::get().to(get_all_users)),
        );
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let store = MongoStore::init(&config.mongo_uri, &config.database_name)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    store
        .ensure_indexes()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let state = AppState {
        store: Arc::new(store),
        notifier: Arc::from(notifier::from_config(&config.smtp)),
        tokens: TokenService::new(&config.jwt_secret),
        credentials: Credentials::new(config.bcrypt_cost),
    };
    let frontend_origin = config.frontend_origin.clone();

    info!("Server running at http://{}", config.bind_addr);
    info!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
