#![doc = "The `taskhive` library crate."]
#![doc = ""]
#![doc = "Server side: domain models, the credential/task stores, the token codec,"]
#![doc = "session middleware and the HTTP routes. Client side: the session"]
#![doc = "controller state machine and the route guard consumed by UI frontends."]
#![doc = "The binary (`main.rs`) wires the server pieces into a running actix-web app."]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
