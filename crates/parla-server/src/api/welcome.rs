use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Welcome {
    pub message: String,
}

#[derive(Serialize)]
pub struct Health {
    pub status: String,
}

// GET /api/welcome
pub async fn welcome() -> Json<Welcome> {
    Json(Welcome {
        message: "Hello from API".to_string(),
    })
}

// GET /health
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "parla is working!".to_string(),
    })
}
