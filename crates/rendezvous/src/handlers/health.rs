use salvo::prelude::*;
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[handler]
pub async fn health(res: &mut Response) {
    res.render(Json(HealthBody { status: "ok" }));
}
