use sagfo_core::Services;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: AuthConfig,
}
