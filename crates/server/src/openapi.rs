use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// Schema-less record body. Any JSON object is accepted; `id` is assigned by
/// the server and ignored on input.
#[derive(ToSchema)]
pub struct DocumentDoc { pub id: i64 }

#[derive(ToSchema)]
pub struct MessageResponse { pub message: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::collections::list,
        crate::routes::collections::create,
        crate::routes::collections::get_one,
        crate::routes::collections::update,
        crate::routes::collections::delete_one,
    ),
    components(
        schemas(
            HealthResponse,
            DocumentDoc,
            MessageResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "collections")
    )
)]
pub struct ApiDoc;
