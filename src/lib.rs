pub mod api;
pub mod boxscore;
pub mod config;
pub mod demo_feed;
pub mod http_client;
pub mod identity;
pub mod live_feed;
pub mod poller;
pub mod provider;
pub mod state;
pub mod teams;
