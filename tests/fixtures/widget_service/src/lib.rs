pub mod api;
pub mod model;

pub struct AppState {
    pub db_url: String,
}

pub fn router() {}
