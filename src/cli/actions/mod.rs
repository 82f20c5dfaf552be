pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        base_url: String,
        backend: String,
        dsn: Option<String>,
        session_ttl: i64,
        lockout_threshold: u32,
        lockout_cooldown: i64,
        rate_limit: u32,
        rate_window: i64,
        password_max_age: Option<i64>,
    },
}
