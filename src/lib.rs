mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod recipes {
    pub mod ledger;
    pub mod read_model;
    pub mod shopping_list;
    pub mod upsert;
}
mod constants;

pub mod accounts;
pub mod api {
    pub mod handlers;
    pub mod rejection;
    pub mod routes;
    pub mod state;
}
pub mod catalog;
pub mod config;

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use recipes::*;
