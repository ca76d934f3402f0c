use crate::{db::Db, gateway::MonerisGateway, settings::Settings};

#[derive(Debug, Clone, axum::extract::FromRef)]
pub struct AppState {
    pub db: Db,
    pub gateway: MonerisGateway,
    pub settings: Settings,
}

impl AppState {
    pub fn new(db: Db, gateway: MonerisGateway, settings: Settings) -> Self {
        Self {
            db,
            gateway,
            settings,
        }
    }
}
