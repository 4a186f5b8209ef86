pub mod api_server;
mod tls;
